//! Wires the stages together: acquisition, extraction into the cache, surname
//! loading and generation.

use std::io::{self, Write};
use std::process::ExitCode;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::archive;
use crate::args::Args;
use crate::cache::NameCache;
use crate::error::{Error, Result};
use crate::extract::{is_valid_candidate, NameExtractor};
use crate::fetch::{self, HttpTransport, RetryPolicy, SourceDescriptor, Transport};
use crate::generator::{generate_name, slug};
use crate::layout::DataLayout;
use crate::romaji::KanjiHepburn;
use crate::surnames::load_surnames;
use crate::text::title_case;

#[derive(Debug, Serialize)]
struct Generated<'a> {
    name: &'a str,
    slug: &'a str,
}

/// Fetches and unpacks whatever is missing, fills the name cache on first
/// use (or when `rebuild` is set) and returns the given names to draw from.
///
/// A populated cache is authoritative; the dictionary is not consulted again
/// even if it has changed.
pub fn prepare_given_names(
    layout: &DataLayout,
    transport: &dyn Transport,
    sources: &[SourceDescriptor],
    policy: &RetryPolicy,
    rebuild: bool,
    quiet: bool,
) -> Result<Vec<String>> {
    let cache = NameCache::new(layout.name_cache());
    let cache_ready = cache.is_populated() && !rebuild;

    fetch::ensure_dictionary(transport, sources, layout, policy)?;
    archive::normalize_dictionary(layout)?;
    fetch::ensure_surname_archive(transport, layout, policy)?;
    archive::extract_surname_table(layout)?;

    if !cache_ready {
        let reader = archive::open_dictionary(layout)?;
        let transliterator = KanjiHepburn::new();
        let names = NameExtractor::new(&transliterator)
            .quiet(quiet)
            .extract_names(reader)?;

        if let Err(e) = cache.populate(&names) {
            warn!(error = %e, "could not write name cache; using extracted names for this run");
            return Ok(names);
        }
        info!(count = names.len(), path = %cache.path().display(), "name cache populated");
    }

    Ok(cache.load())
}

pub fn run(args: &Args) -> Result<ExitCode> {
    let layout = DataLayout::create(&args.data_dir)?;

    if let Some(raw) = &args.add {
        return Ok(if add_name(&layout, raw) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let policy = RetryPolicy::default();
    let sources = match &args.sources {
        Some(path) => fetch::load_sources(path)?,
        None => fetch::default_sources(),
    };
    let transport = HttpTransport::new(&policy, args.quiet)?;

    let given_names = prepare_given_names(
        &layout,
        &transport,
        &sources,
        &policy,
        args.rebuild_cache,
        args.quiet,
    )?;
    if given_names.is_empty() {
        error!("no Japanese names available; check the data files");
        return Ok(ExitCode::FAILURE);
    }

    let surnames = load_surnames(&layout.surname_table())?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for _ in 0..args.count {
        let name = generate_name(&mut rng, &given_names, &surnames)?;
        let slug = slug(&name);
        write_result(&mut out, &name, &slug, args.json)
            .map_err(|e| Error::io("cannot write to stdout", e))?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Title-cases `raw` and appends it to the name cache if it passes the same
/// validation as extracted names. Returns whether it was accepted.
fn add_name(layout: &DataLayout, raw: &str) -> bool {
    let name = title_case(raw.trim());
    if !is_valid_candidate(&name) {
        error!(name = %raw, "not a usable given name; nothing added");
        return false;
    }
    NameCache::new(layout.name_cache()).append(&name);
    info!(%name, "added to name cache");
    true
}

fn write_result(out: &mut impl Write, name: &str, slug: &str, json: bool) -> io::Result<()> {
    if json {
        let line = serde_json::to_string(&Generated { name, slug })?;
        writeln!(out, "{line}")
    } else {
        writeln!(out, "{name}")?;
        writeln!(out, "{slug}")
    }
}
