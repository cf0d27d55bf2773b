use crate::config::{DeezerConfig, OutputOverrides, ServarrConfig};
use crate::export::{Column, CsvLayout};
use crate::fetch::{Endpoint, Header, Pagination, DEFAULT_MAX_PAGES};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// Deezer hands out favourites 25 at a time.
pub const DEEZER_PAGE_SIZE: usize = 25;

const DEEZER_API: &str = "https://api.deezer.com";

/// What to do when an upstream has nothing to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Report it and leave existing files alone.
    Skip,
    /// Write empty exports.
    Write,
    /// Treat it as an error.
    Fail,
}

impl FromStr for EmptyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "write" => Ok(Self::Write),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "unknown empty policy {:?}, expected skip, write or fail",
                other
            )),
        }
    }
}

/// How a finished export is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// `3 movies exported to movie_list.csv`
    ExportedTo,
    /// `30 Deezer artist IDs saved to 'config/deezer_artist_ids.csv'`
    SavedTo,
}

impl Report {
    pub fn line(self, count: usize, noun: &str, path: &Path) -> String {
        match self {
            Self::ExportedTo => format!("{} {} exported to {}", count, noun, path.display()),
            Self::SavedTo => format!("{} {} saved to '{}'", count, noun, path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvOutput {
    pub path: PathBuf,
    pub layout: CsvLayout,
}

/// One exportable collection: where to fetch it from and where it goes.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub name: &'static str,
    /// Plural used in messages, e.g. "movies".
    pub noun: &'static str,
    pub endpoint: Endpoint,
    pub json: Option<PathBuf>,
    pub csv: Option<CsvOutput>,
    pub on_empty: EmptyPolicy,
    pub report: Report,
}

impl Upstream {
    /// Every movie in a Radarr library.
    pub fn radarr(config: &ServarrConfig) -> Self {
        Self {
            name: "radarr",
            noun: "movies",
            endpoint: servarr_endpoint(config, "movie"),
            json: Some("movie_list.json".into()),
            csv: Some(CsvOutput {
                path: "movie_list.csv".into(),
                layout: CsvLayout::titled("TMDB ID", "tmdbId"),
            }),
            on_empty: EmptyPolicy::Skip,
            report: Report::ExportedTo,
        }
    }

    /// Every series in a Sonarr library.
    pub fn sonarr(config: &ServarrConfig) -> Self {
        Self {
            name: "sonarr",
            noun: "TV shows",
            endpoint: servarr_endpoint(config, "series"),
            json: Some("show_list.json".into()),
            csv: Some(CsvOutput {
                path: "show_list.csv".into(),
                layout: CsvLayout::titled("TVDB ID", "tvdbId"),
            }),
            on_empty: EmptyPolicy::Skip,
            report: Report::ExportedTo,
        }
    }

    /// A Deezer user's favourite artists, as a single column of ids.
    pub fn deezer_artists(config: &DeezerConfig) -> Self {
        let url = format!("{}/user/{}/artists", DEEZER_API, config.user_id);
        Self {
            name: "deezer",
            noun: "Deezer artist IDs",
            endpoint: Endpoint {
                url: Url::parse(&url).expect("deezer url is valid"),
                headers: Vec::new(),
                pagination: Pagination::OffsetLimit {
                    page_size: DEEZER_PAGE_SIZE,
                    max_pages: DEFAULT_MAX_PAGES,
                },
            },
            json: None,
            csv: Some(CsvOutput {
                path: PathBuf::from("config").join("deezer_artist_ids.csv"),
                layout: CsvLayout::new(vec![Column::new("artistId", "id")]),
            }),
            on_empty: EmptyPolicy::Write,
            report: Report::SavedTo,
        }
    }

    /// Replace default output paths. An override for an output this upstream
    /// does not produce enables it; json has no layout to worry about, and csv
    /// falls back to an id column.
    pub fn with_outputs(mut self, overrides: &OutputOverrides) -> Self {
        if let Some(path) = &overrides.json {
            self.json = Some(path.clone());
        }
        if let Some(path) = &overrides.csv {
            match &mut self.csv {
                Some(csv) => csv.path = path.clone(),
                None => {
                    self.csv = Some(CsvOutput {
                        path: path.clone(),
                        layout: CsvLayout::new(vec![Column::new("id", "id")]),
                    });
                }
            }
        }
        self
    }

    /// Change how many pages a paged upstream may request. No effect on single request upstreams.
    pub fn with_max_pages(mut self, max: usize) -> Self {
        if let Pagination::OffsetLimit { max_pages, .. } = &mut self.endpoint.pagination {
            *max_pages = max;
        }
        self
    }
}

fn servarr_endpoint(config: &ServarrConfig, resource: &str) -> Endpoint {
    let mut url = config.base_url.clone();
    // Base urls are validated as http(s), which can always take path segments.
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(&["api", "v3", resource]);
    }

    Endpoint {
        url,
        headers: vec![Header {
            name: "X-Api-Key".into(),
            value: config.api_key.clone(),
        }],
        pagination: Pagination::Single,
    }
}
