use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "apksigblock")]
#[command(version)]
#[command(about = "Inspect the APK Signing Block of a signed APK", long_about = None)]
#[command(after_help = "Examples:\n  \
  apksigblock app.apk                  show regions and ID-value pairs\n  \
  apksigblock -p 0x7109871a app.apk    write the v2 signature block to stdout\n  \
  apksigblock -d out app.apk           dump the four regions into out/\n  \
  apksigblock -l https://example.com/app.apk   list pairs of a remote APK")]
pub struct Cli {
    /// APK file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// List pair IDs only (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// Write the value of pair ID to stdout (hex with 0x, or decimal)
    #[arg(short = 'p', value_name = "ID", value_parser = parse_block_id)]
    pub pipe: Option<u32>,

    /// Dump the four regions into DIR (local files only)
    #[arg(short = 'd', value_name = "DIR")]
    pub dump_dir: Option<String>,

    /// Verbose logging (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe.is_some()
    }

    /// Reject option combinations clap cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.dump_dir.is_some() && self.is_http_url() {
            return Err("-d only works on local files".to_string());
        }
        Ok(())
    }

    /// Maximum log level implied by `-v` and `-q`.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet > 0 {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Parse a block ID given as `0x`-prefixed hex or decimal.
pub fn parse_block_id(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid block ID '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_formats() {
        assert_eq!(parse_block_id("0x7109871a"), Ok(0x7109871a));
        assert_eq!(parse_block_id("0X7109871A"), Ok(0x7109871a));
        assert_eq!(parse_block_id("1896449818"), Ok(0x7109871a));
        assert!(parse_block_id("0xZZ").is_err());
        assert!(parse_block_id("-1").is_err());
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from(["apksigblock", "-vv", "-p", "0x42726577", "a.apk"]).unwrap();
        assert_eq!(cli.file, "a.apk");
        assert_eq!(cli.pipe, Some(0x42726577));
        assert!(cli.is_quiet());
        assert_eq!(cli.log_level(), log::LevelFilter::Debug);
        assert!(!cli.is_http_url());

        let cli = Cli::try_parse_from(["apksigblock", "-q", "https://x/app.apk"]).unwrap();
        assert!(cli.is_http_url());
        assert_eq!(cli.log_level(), log::LevelFilter::Error);
    }

    #[test]
    fn dump_requires_local_file() {
        let cli = Cli::try_parse_from(["apksigblock", "-d", "out", "https://x/app.apk"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["apksigblock", "-d", "out", "app.apk"]).unwrap();
        assert!(cli.validate().is_ok());
    }
}
