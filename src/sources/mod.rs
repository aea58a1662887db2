pub mod cisco;
pub mod qrt;

use std::fmt;

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::http::Fetch;
use crate::record::{JobRecord, RunStamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Source {
    /// jobs.cisco.com HTML search pages
    Cisco,
    /// QRT Greenhouse boards API
    Qrt,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Cisco, Source::Qrt];

    pub fn name(self) -> &'static str {
        match self {
            Source::Cisco => "cisco",
            Source::Qrt => "qrt",
        }
    }

    pub fn listings_url(self) -> &'static str {
        match self {
            Source::Cisco => cisco::BASE_URL,
            Source::Qrt => qrt::BASE_URL,
        }
    }

    /// Extension for saved raw responses.
    pub fn raw_extension(self) -> &'static str {
        match self {
            Source::Cisco => "html",
            Source::Qrt => "json",
        }
    }

    /// Scrape every listed job. `params` go on the listings request only.
    pub fn run(self, fetcher: &dyn Fetch, stamp: &RunStamp, params: &[(&str, &str)]) -> Result<Vec<JobRecord>> {
        match self {
            Source::Cisco => cisco::run(fetcher, stamp, params),
            Source::Qrt => qrt::run(fetcher, stamp, params),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
