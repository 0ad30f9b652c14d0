use std::io::{BufRead, Write};

use clap::Parser;
use filmshelf::{
    Error,
    Record,
    Result,
    Storage,
    StoreConfig,
    cli::{
        AddArgs,
        Cli,
        Command,
        DeleteArgs,
        FilterArgs,
        ListArgs,
        NoteArgs,
        RateArgs,
        SearchArgs,
        SortKey,
    },
    disambiguate::{Selection, select_title},
    migration::MigrationOutcome,
    normalize::same_title,
    prompt::LineDisambiguator,
    report,
    resolve::MatchCascade,
    storage,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("FILMSHELF_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let config = StoreConfig::resolve(cli.store.as_deref())?;
    let store = storage::open(&config)?;

    match cli.command {
        Command::List(args) => cmd_list(store.as_ref(), &args)?,
        Command::Add(args) => cmd_add(store.as_ref(), args)?,
        Command::Delete(args) => cmd_delete(store.as_ref(), &args)?,
        Command::Rate(args) => cmd_rate(store.as_ref(), &args)?,
        Command::Note(args) => cmd_note(store.as_ref(), &args)?,
        Command::Search(args) => cmd_search(store.as_ref(), &args)?,
        Command::Stats => cmd_stats(store.as_ref())?,
        Command::Random => cmd_random(store.as_ref())?,
        Command::Filter(args) => cmd_filter(store.as_ref(), &args)?,
        Command::Migrate => cmd_migrate(store.as_ref())?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn display_line(record: &Record) -> String {
    let year = if record.year.is_empty() {
        "?"
    } else {
        record.year.as_str()
    };
    let rating = record
        .rating
        .map_or_else(|| "N/A".to_string(), |r| r.to_string());
    format!("{} ({year}): {rating}", record.title)
}

fn record_json(record: &Record) -> serde_json::Value {
    json!({
        "title": record.title,
        "year": record.year,
        "rating": record.rating.map(|r| r.value()),
        "poster": record.poster,
        "notes": record.notes,
        "external_id": record.external_id,
    })
}

fn print_records<'a>(records: impl IntoIterator<Item = &'a Record>) {
    for record in records {
        println!("{}", display_line(record));
    }
}

/// Resolve a user query to one stored title, asking on the terminal when
/// several titles match.
fn resolve_query(store: &dyn Storage, query: &str) -> Result<Option<String>> {
    let catalog = store.list()?;
    if catalog.is_empty() {
        println!("No movies in database.");
        return Ok(None);
    }

    let stdin = std::io::stdin();
    let mut disambiguator =
        LineDisambiguator::new(stdin.lock(), std::io::stdout());
    let selection = select_title(
        &MatchCascade::new(),
        catalog.titles(),
        query,
        &mut disambiguator,
    );

    Ok(match selection {
        Selection::Chosen(title) => Some(title),
        Selection::Cancelled => {
            println!("Cancelled.");
            None
        }
        Selection::NoMatch => {
            println!("No matching titles found.");
            None
        }
    })
}

fn cmd_list(store: &dyn Storage, args: &ListArgs) -> Result<()> {
    let catalog = store.list()?;
    let records = match args.sort {
        Some(SortKey::Rating) => report::sorted_by_rating(&catalog),
        Some(SortKey::Year) => {
            report::sorted_by_year(&catalog, args.latest_first)
        }
        None => catalog.iter().collect(),
    };

    if args.json {
        let items: Vec<_> = records.iter().copied().map(record_json).collect();
        println!("{}", serde_json::Value::Array(items));
    } else if records.is_empty() {
        println!("No movies in database.");
    } else {
        println!("{} movies in total", records.len());
        print_records(records);
    }
    Ok(())
}

fn cmd_add(store: &dyn Storage, args: AddArgs) -> Result<()> {
    let record = Record {
        title: args.title.trim().to_string(),
        year: args.year.trim().to_string(),
        rating: args.rating,
        poster: args.poster,
        notes: args.notes,
        external_id: args.external_id,
    };
    let line = display_line(&record);
    store.add(record)?;
    println!("Added: {line}");
    Ok(())
}

fn cmd_delete(store: &dyn Storage, args: &DeleteArgs) -> Result<()> {
    let Some(title) = resolve_query(store, &args.query)? else {
        return Ok(());
    };

    if !args.yes {
        print!(
            "Type the exact title to confirm deletion of '{title}' \
             (or press Enter to cancel): "
        );
        std::io::stdout().flush()?;
        let mut typed = String::new();
        std::io::stdin().lock().read_line(&mut typed)?;
        if !same_title(&typed, &title) {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    store.delete(&title)?;
    println!("'{title}' successfully deleted.");
    Ok(())
}

fn cmd_rate(store: &dyn Storage, args: &RateArgs) -> Result<()> {
    let Some(title) = resolve_query(store, &args.query)? else {
        return Ok(());
    };
    store.update_rating(&title, args.rating)?;
    match args.rating {
        Some(rating) => println!("Rated '{title}' {rating}."),
        None => println!("Rating cleared for '{title}'."),
    }
    Ok(())
}

fn cmd_note(store: &dyn Storage, args: &NoteArgs) -> Result<()> {
    let Some(title) = resolve_query(store, &args.query)? else {
        return Ok(());
    };
    let text = args.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
    store.update_notes(&title, text)?;
    match text {
        Some(_) => println!("Movie '{title}' successfully updated with note."),
        None => println!("Note cleared for '{title}'."),
    }
    Ok(())
}

fn cmd_search(store: &dyn Storage, args: &SearchArgs) -> Result<()> {
    let Some(title) = resolve_query(store, &args.query)? else {
        return Ok(());
    };
    let catalog = store.list()?;
    let record = catalog
        .get(&title)
        .ok_or_else(|| Error::NotFound { title: title.clone() })?;

    if args.json {
        println!("{}", record_json(record));
    } else {
        println!("{}", display_line(record));
        if let Some(notes) = &record.notes {
            println!("  notes: {notes}");
        }
        if let Some(poster) = &record.poster {
            println!("  poster: {poster}");
        }
    }
    Ok(())
}

fn cmd_stats(store: &dyn Storage) -> Result<()> {
    match report::stats(&store.list()?) {
        Some(s) => println!(
            "Average: {:.1}, Median: {:.1}, Best: {}, Worst: {}",
            s.average, s.median, s.best, s.worst
        ),
        None => println!("No rated movies in database."),
    }
    Ok(())
}

fn cmd_random(store: &dyn Storage) -> Result<()> {
    let catalog = store.list()?;
    match report::random_pick(&catalog, &mut rand::thread_rng()) {
        Some(record) => println!(
            "Your random movie for tonight is: {}",
            display_line(record)
        ),
        None => println!("No movies in database."),
    }
    Ok(())
}

fn cmd_filter(store: &dyn Storage, args: &FilterArgs) -> Result<()> {
    let catalog = store.list()?;
    let criteria = report::Filter {
        min_rating: args.min_rating,
        start_year: args.from,
        end_year: args.to,
    };
    let matches = report::filter(&catalog, &criteria);
    if matches.is_empty() {
        println!("No movies match criteria.");
    } else {
        print_records(matches);
    }
    Ok(())
}

fn cmd_migrate(store: &dyn Storage) -> Result<()> {
    let Some(csv) = store.as_csv() else {
        println!("Current backend is not CSV; nothing to migrate.");
        return Ok(());
    };

    match csv.migrate()? {
        MigrationOutcome::Unchanged => println!(
            "No change: columns already present in {}",
            csv.path().display()
        ),
        MigrationOutcome::Changed { added, backup } => {
            println!(
                "Migrated: added columns {} to {}",
                added.join(", "),
                csv.path().display()
            );
            if let Some(backup) = backup {
                println!("Backup written to {}", backup.display());
            }
        }
    }
    Ok(())
}
