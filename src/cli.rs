//! Command-line interface for the rule generator.

use std::path::PathBuf;

use clap::Parser;
use rulegen::{FileJob, GenOptions, GenResult};

#[derive(Parser, Debug)]
#[command(name = "rulegen")]
#[command(about = "Compile SSA rewrite rules into Rust rewrite procedures", long_about = None)]
pub struct Cli {
    /// Emit a tracing event from every generated rewrite
    #[arg(long)]
    pub log: bool,

    /// Directory holding generic.json and <ARCH>.json [default: each rule file's directory]
    #[arg(long, value_name = "DIR")]
    pub descriptors: Option<PathBuf>,

    /// Output directory [default: parent of each rule file's directory]
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Increase diagnostic verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Rule files; each file's stem names its architecture
    #[arg(required = true, value_name = "RULES")]
    pub rules: Vec<PathBuf>,
}

impl Cli {
    pub fn options(&self) -> GenOptions {
        GenOptions { log: self.log }
    }

    pub fn jobs(&self) -> impl Iterator<Item = FileJob> + '_ {
        self.rules.iter().map(|rules| FileJob {
            rules: rules.clone(),
            descriptors: self.descriptors.clone(),
            out_dir: self.out_dir.clone(),
        })
    }
}

/// Process every rule file in order, stopping at the first error.
pub fn run(cli: &Cli) -> GenResult<Vec<PathBuf>> {
    let options = cli.options();
    cli.jobs().map(|job| job.run(&options)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "rulegen",
            "--log",
            "--descriptors",
            "schema",
            "gen/generic.rules",
            "gen/AMD64.rules",
        ])
        .unwrap();
        assert!(cli.log);
        assert_eq!(cli.descriptors, Some(PathBuf::from("schema")));
        assert_eq!(cli.out_dir, None);

        let jobs: Vec<_> = cli.jobs().collect();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].arch().unwrap(), "AMD64");
        assert_eq!(jobs[1].descriptors_dir(), PathBuf::from("schema"));
        assert_eq!(jobs[1].out_dir(), PathBuf::from("gen/.."));
    }

    #[test]
    fn test_rules_required() {
        assert!(Cli::try_parse_from(["rulegen", "--log"]).is_err());
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["rulegen", "-vv", "generic.rules"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.options().log);
    }
}
