use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use anyhow::{bail, Context};
use colored::Colorize;

use relic_archive::{
    parse_conditions, parse_metadata, Archive, ArchiveError, Condition, Digest, Metadata,
};

use crate::cli::*;

/// Exit code for "the named digest or match set does not exist".
const EXIT_NOT_FOUND: i32 = 2;

pub fn run_command(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Create => cmd_create(&cli),
        Command::Add(ref args) => cmd_add(&cli, args),
        Command::Write(ref args) => cmd_write(&cli, args),
        Command::Query(ref args) => cmd_query(&cli, args),
        Command::Print(ref args) => cmd_print(&cli, args),
        Command::Remove(ref args) => cmd_remove(&cli, args),
        Command::Verify => cmd_verify(&cli),
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<Archive> {
    Archive::open(&cli.store).with_context(|| format!("cannot open store at {}", cli.store.display()))
}

/// Positional arguments that are either digests or key=value conditions.
enum Targets {
    Digests(Vec<Digest>),
    Conditions(Vec<Condition>),
}

fn parse_targets(args: &[String]) -> anyhow::Result<Targets> {
    // No arguments is the empty condition set, which matches everything.
    if args.is_empty() {
        return Ok(Targets::Conditions(Vec::new()));
    }
    if args.iter().any(|a| a.contains('=')) {
        if !args.iter().all(|a| a.contains('=')) {
            bail!("cannot mix digests and key=value conditions");
        }
        Ok(Targets::Conditions(parse_conditions(args)?))
    } else {
        let digests = args
            .iter()
            .map(|a| Digest::from_hex(a).with_context(|| format!("invalid digest '{a}'")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Targets::Digests(digests))
    }
}

fn cmd_create(cli: &Cli) -> anyhow::Result<i32> {
    Archive::create(&cli.store)
        .with_context(|| format!("cannot create store at {}", cli.store.display()))?;
    println!(
        "{} Initialized empty store in {}",
        "✓".green().bold(),
        cli.store.display().to_string().bold()
    );
    Ok(0)
}

fn cmd_add(cli: &Cli, args: &AddArgs) -> anyhow::Result<i32> {
    let metadata = parse_metadata(&args.metadata)?;
    let mut archive = open_store(cli)?;
    let digest = archive
        .add_path(&args.file, &metadata)
        .with_context(|| format!("cannot add {}", args.file.display()))?;
    println!("{digest}");
    Ok(0)
}

fn cmd_write(cli: &Cli, args: &WriteArgs) -> anyhow::Result<i32> {
    let metadata = parse_metadata(&args.metadata)?;
    let mut content = Vec::new();
    io::stdin()
        .read_to_end(&mut content)
        .context("cannot read stdin")?;
    let mut archive = open_store(cli)?;
    let digest = archive.add(&content, &metadata)?;
    println!("{digest}");
    Ok(0)
}

fn cmd_query(cli: &Cli, args: &QueryArgs) -> anyhow::Result<i32> {
    let conditions = parse_conditions(&args.conditions)?;
    let archive = open_store(cli)?;
    let results = archive.query(&conditions)?;
    match cli.format {
        OutputFormat::Text => print_entries_text(results.into_iter()),
        OutputFormat::Json => print_entries_json(results.into_iter())?,
    }
    Ok(0)
}

fn cmd_print(cli: &Cli, args: &PrintArgs) -> anyhow::Result<i32> {
    let archive = open_store(cli)?;
    let entries = match parse_targets(&args.targets)? {
        Targets::Digests(digests) => match archive.print_digests(&digests) {
            Ok(entries) => entries,
            Err(ArchiveError::NotFound(digest)) => {
                eprintln!("no entry for digest {digest}");
                return Ok(EXIT_NOT_FOUND);
            }
            Err(e) => return Err(e.into()),
        },
        Targets::Conditions(conditions) => {
            let entries = archive.print_matching(&conditions)?;
            if entries.is_empty() {
                eprintln!("no match found");
                return Ok(EXIT_NOT_FOUND);
            }
            entries
        }
    };

    if args.content {
        let (digest, _) = match entries.iter().next() {
            Some(first) if entries.len() == 1 => first,
            _ => bail!("--content needs exactly one matching digest, got {}", entries.len()),
        };
        let content = archive.get(digest)?;
        io::stdout().write_all(&content)?;
        return Ok(0);
    }

    match cli.format {
        OutputFormat::Text => print_entries_text(entries.into_iter()),
        OutputFormat::Json => print_entries_json(entries.into_iter())?,
    }
    Ok(0)
}

fn cmd_remove(cli: &Cli, args: &RemoveArgs) -> anyhow::Result<i32> {
    let mut archive = open_store(cli)?;
    match parse_targets(&args.targets)? {
        Targets::Digests(digests) => {
            // A missing digest must not abort the rest of the list; report
            // the whole not-found set once the removals are done.
            let mut missing = Vec::new();
            for digest in &digests {
                match archive.remove(digest) {
                    Ok(()) => println!("removed {digest}"),
                    Err(ArchiveError::NotFound(_)) => missing.push(*digest),
                    Err(e) => return Err(e.into()),
                }
            }
            if missing.is_empty() {
                return Ok(0);
            }
            for digest in &missing {
                eprintln!("no entry for digest {digest}");
            }
            Ok(EXIT_NOT_FOUND)
        }
        Targets::Conditions(conditions) => {
            if conditions.is_empty() && !args.force {
                bail!("not removing every entry unless --force is given");
            }
            let removed = archive.remove_matching(&conditions)?;
            println!("removed {removed}");
            Ok(0)
        }
    }
}

fn cmd_verify(cli: &Cli) -> anyhow::Result<i32> {
    let archive = open_store(cli)?;
    let report = archive.verify()?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            if report.is_clean() {
                println!("{} store is consistent", "✓".green().bold());
            } else {
                for digest in &report.corrupt {
                    println!("{} {digest}", "corrupt: ".red().bold());
                }
                for digest in &report.missing {
                    println!("{} {digest}", "missing: ".yellow().bold());
                }
                for digest in &report.orphaned {
                    println!("{} {digest}", "orphaned:".blue().bold());
                }
            }
        }
    }
    Ok(if report.is_clean() { 0 } else { 1 })
}

fn print_entries_text(entries: impl Iterator<Item = (Digest, Metadata)>) {
    for (digest, metadata) in entries {
        println!("{}", digest.to_string().yellow());
        for (key, value) in metadata.iter() {
            println!("\t{key}\t{value}");
        }
    }
}

fn print_entries_json(
    entries: impl Iterator<Item = (Digest, Metadata)>,
) -> anyhow::Result<()> {
    let map: BTreeMap<String, Metadata> = entries
        .map(|(digest, metadata)| (digest.to_hex(), metadata))
        .collect();
    println!("{}", serde_json::to_string_pretty(&map)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_all_digests() {
        let hex = "ab".repeat(20);
        let targets = parse_targets(&[hex.clone(), hex.clone()]).unwrap();
        assert!(matches!(targets, Targets::Digests(ds) if ds.len() == 2));
    }

    #[test]
    fn targets_all_conditions() {
        let args = vec!["model=weather2".to_string(), "cluster=poly".to_string()];
        let targets = parse_targets(&args).unwrap();
        assert!(matches!(targets, Targets::Conditions(cs) if cs.len() == 2));
    }

    #[test]
    fn targets_empty_means_match_everything() {
        let targets = parse_targets(&[]).unwrap();
        assert!(matches!(targets, Targets::Conditions(cs) if cs.is_empty()));
    }

    #[test]
    fn mixed_targets_are_rejected() {
        let args = vec!["ab".repeat(20), "model=weather2".to_string()];
        assert!(parse_targets(&args).is_err());
    }

    #[test]
    fn bad_digest_is_rejected() {
        let args = vec!["nothex".to_string()];
        assert!(parse_targets(&args).is_err());
    }

    fn cli_for(root: &std::path::Path) -> Cli {
        Cli {
            store: root.to_path_buf(),
            command: Command::Verify,
            format: OutputFormat::Text,
        }
    }

    #[test]
    fn remove_without_force_refuses_to_match_everything() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        Archive::create(&root)
            .unwrap()
            .add(b"precious", &Metadata::new())
            .unwrap();

        let cli = cli_for(&root);
        let args = RemoveArgs {
            targets: Vec::new(),
            force: false,
        };
        assert!(cmd_remove(&cli, &args).is_err());
        // Nothing was removed.
        assert_eq!(Archive::open(&root).unwrap().find(&[]).unwrap().len(), 1);

        let args = RemoveArgs {
            targets: Vec::new(),
            force: true,
        };
        assert_eq!(cmd_remove(&cli, &args).unwrap(), 0);
        assert!(Archive::open(&root).unwrap().find(&[]).unwrap().is_empty());
    }

    #[test]
    fn remove_continues_past_missing_digests() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let (d1, d2) = {
            let mut archive = Archive::create(&root).unwrap();
            (
                archive.add(b"first", &Metadata::new()).unwrap(),
                archive.add(b"second", &Metadata::new()).unwrap(),
            )
        };

        let cli = cli_for(&root);
        let args = RemoveArgs {
            targets: vec![d1.to_hex(), "ab".repeat(20), d2.to_hex()],
            force: false,
        };
        let code = cmd_remove(&cli, &args).unwrap();
        assert_eq!(code, EXIT_NOT_FOUND);

        // Digests after the missing one were still removed.
        assert!(Archive::open(&root).unwrap().find(&[]).unwrap().is_empty());
    }
}
