use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "hybrid-names")]
#[command(about = "Generate hybrid names: a Japanese given name (JMnedict) with a US Census surname")]
pub struct Args {
    /// Directory holding the dictionary, the surname table and the name cache
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Number of names to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// YAML file replacing the built-in dictionary mirror list
    #[arg(long)]
    pub sources: Option<PathBuf>,

    /// Re-extract given names from the dictionary even if the cache is populated
    #[arg(long)]
    pub rebuild_cache: bool,

    /// Append a given name to the name cache and exit
    #[arg(long, value_name = "NAME")]
    pub add: Option<String>,

    /// Print one JSON object per generated name
    #[arg(long)]
    pub json: bool,

    /// Quiet mode - no progress bars, warnings only
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_match_plain_invocation() {
        let args = Args::parse_from(["hybrid-names"]);
        assert_eq!(args.data_dir, PathBuf::from("data"));
        assert_eq!(args.count, 1);
        assert!(args.seed.is_none());
        assert!(!args.rebuild_cache && !args.json && !args.quiet);
    }

    #[test]
    fn flags_parse() {
        let args = Args::parse_from([
            "hybrid-names", "--data-dir", "/tmp/x", "-n", "5", "--seed", "9", "--json", "-q",
        ]);
        assert_eq!(args.data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(args.count, 5);
        assert_eq!(args.seed, Some(9));
        assert!(args.json && args.quiet);
    }
}
