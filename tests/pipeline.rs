use attohttpc::StatusCode;
use mediadump::config::{DeezerConfig, OutputOverrides, ServarrConfig};
use mediadump::error::FetchError;
use mediadump::export::read_json;
use mediadump::fetch::{Request, Transport};
use mediadump::upstream::{EmptyPolicy, Upstream};
use mediadump::{dump, Error, ExportSummary};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::fs::{read_to_string, write};
use std::path::Path;
use url::Url;

/// A Deezer favourites endpoint backed by a list of artist ids.
struct Deezer {
    artists: Vec<u64>,
    fail_at: Option<usize>,
    requests: RefCell<Vec<(usize, usize)>>,
}

impl Deezer {
    fn new(count: u64) -> Self {
        Self {
            artists: (1..=count).map(|n| 1000 + n).collect(),
            fail_at: None,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl Transport for Deezer {
    fn get(&self, request: &Request<'_>) -> Result<String, FetchError> {
        assert_eq!(request.url.path(), "/user/2529/artists");
        let query = |key: &str| -> usize {
            let (_, value) = request.query.iter().find(|(k, _)| *k == key).unwrap();
            value.parse().unwrap()
        };
        let (index, limit) = (query("index"), query("limit"));
        self.requests.borrow_mut().push((index, limit));

        if self.fail_at == Some(index) {
            return Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }

        let end = (index + limit).min(self.artists.len());
        let data: Vec<Value> = self.artists[index.min(end)..end]
            .iter()
            .map(|id| json!({ "id": id, "name": format!("Artist {}", id), "type": "artist" }))
            .collect();
        let mut body = json!({ "data": data, "total": self.artists.len() });
        if end < self.artists.len() {
            body["next"] = json!(format!(
                "https://api.deezer.com/user/2529/artists?limit={}&index={}",
                limit, end
            ));
        }
        Ok(body.to_string())
    }
}

/// A Radarr instance answering with a fixed body.
struct Radarr(Result<Value, StatusCode>);

impl Transport for Radarr {
    fn get(&self, request: &Request<'_>) -> Result<String, FetchError> {
        assert_eq!(request.url.path(), "/api/v3/movie");
        assert_eq!(request.headers[0].value, "secret");
        match &self.0 {
            Ok(body) => Ok(body.to_string()),
            Err(status) => Err(FetchError::Status(*status)),
        }
    }
}

fn deezer_into(dir: &Path) -> Upstream {
    Upstream::deezer_artists(&DeezerConfig { user_id: 2529 }).with_outputs(&OutputOverrides {
        json: None,
        csv: Some(dir.join("deezer_artist_ids.csv")),
    })
}

fn radarr_into(dir: &Path) -> Upstream {
    let config = ServarrConfig {
        api_key: "secret".into(),
        base_url: Url::parse("http://localhost:7878").unwrap(),
    };
    Upstream::radarr(&config).with_outputs(&OutputOverrides {
        json: Some(dir.join("movie_list.json")),
        csv: Some(dir.join("movie_list.csv")),
    })
}

#[test]
fn thirty_favourite_artists() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = deezer_into(dir.path());
    let deezer = Deezer::new(30);

    let summary = dump(&upstream, &deezer).expect("export failed");

    assert_eq!(*deezer.requests.borrow(), vec![(0, 25), (25, 25)]);
    assert_eq!(summary.count, 30);
    assert_eq!(summary.written, vec![dir.path().join("deezer_artist_ids.csv")]);

    let text = read_to_string(dir.path().join("deezer_artist_ids.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 31);
    assert_eq!(lines[0], "artistId");
    assert_eq!(lines[1], "1001");
    assert_eq!(lines[30], "1030");
}

#[test]
fn failed_page_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = deezer_into(dir.path());
    let path = dir.path().join("deezer_artist_ids.csv");
    write(&path, "artistId\n42\n").unwrap();

    let mut deezer = Deezer::new(60);
    deezer.fail_at = Some(50);
    let err = dump(&upstream, &deezer).unwrap_err();

    assert!(matches!(
        err,
        Error::Fetch(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
    ));
    assert_eq!(deezer.requests.borrow().len(), 3);
    assert_eq!(read_to_string(&path).unwrap(), "artistId\n42\n");
}

#[test]
fn movies_export_json_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = radarr_into(dir.path());
    let movies = json!([
        { "id": 3, "title": "The Thing", "year": 1982, "tmdbId": 1091, "monitored": true },
        { "id": 1, "title": "Arrival", "year": 2016, "tmdbId": 329865, "monitored": false },
        { "id": 2, "title": "Paprika", "year": 2006, "tmdbId": 4977, "monitored": true },
    ]);

    let summary = dump(&upstream, &Radarr(Ok(movies.clone()))).unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.written.len(), 2);

    let exported = read_json(&dir.path().join("movie_list.json")).unwrap();
    let ids: Vec<String> = exported.iter().map(|m| m.id().unwrap().into_owned()).collect();
    assert_eq!(ids, vec!["3", "1", "2"]);
    assert_eq!(serde_json::to_value(&exported).unwrap(), movies);

    let csv = read_to_string(dir.path().join("movie_list.csv")).unwrap();
    assert_eq!(
        csv,
        "Title,Year,TMDB ID\nArrival,2016,329865\nPaprika,2006,4977\nThe Thing,1982,1091\n"
    );
}

#[test]
fn unauthorized_is_not_an_empty_library() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = radarr_into(dir.path());

    let err = dump(&upstream, &Radarr(Err(StatusCode::UNAUTHORIZED))).unwrap_err();

    assert!(matches!(
        err,
        Error::Fetch(FetchError::Status(StatusCode::UNAUTHORIZED))
    ));
    assert!(!dir.path().join("movie_list.json").exists());
    assert!(!dir.path().join("movie_list.csv").exists());
}

#[test]
fn empty_library_policies() {
    let dir = tempfile::tempdir().unwrap();
    let empty = Radarr(Ok(json!([])));

    let upstream = radarr_into(dir.path());
    assert_eq!(upstream.on_empty, EmptyPolicy::Skip);
    assert_eq!(dump(&upstream, &empty).unwrap(), ExportSummary::default());
    assert!(!dir.path().join("movie_list.json").exists());

    let mut upstream = radarr_into(dir.path());
    upstream.on_empty = EmptyPolicy::Fail;
    assert!(matches!(
        dump(&upstream, &empty),
        Err(Error::Empty { noun: "movies" })
    ));

    let mut upstream = radarr_into(dir.path());
    upstream.on_empty = EmptyPolicy::Write;
    let summary = dump(&upstream, &empty).unwrap();
    assert_eq!(summary.count, 0);
    assert_eq!(
        read_to_string(dir.path().join("movie_list.json")).unwrap(),
        "[]\n"
    );
    assert_eq!(
        read_to_string(dir.path().join("movie_list.csv")).unwrap(),
        "Title,Year,TMDB ID\n"
    );
}

#[test]
fn missing_output_directory_is_a_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = deezer_into(&dir.path().join("config"));

    let err = dump(&upstream, &Deezer::new(3)).unwrap_err();

    assert!(matches!(err, Error::Write(_)));
}

#[test]
fn json_keeps_upstream_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = radarr_into(dir.path());
    let movies = json!([{ "title": "Heat", "year": 1995, "id": 7, "tmdbId": 949 }]);

    dump(&upstream, &Radarr(Ok(movies))).unwrap();

    let text = read_to_string(dir.path().join("movie_list.json")).unwrap();
    let positions: Vec<usize> = ["\"title\"", "\"year\"", "\"id\"", "\"tmdbId\""]
        .iter()
        .map(|key| text.find(key).unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "{}", text);
}

#[test]
fn failed_csv_leaves_json_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("movie_list.json");
    write(&json_path, "OLD").unwrap();
    let upstream = radarr_into(dir.path()).with_outputs(&OutputOverrides {
        json: None,
        csv: Some(dir.path().join("missing").join("movie_list.csv")),
    });
    let movies = json!([{ "id": 1, "title": "Heat", "year": 1995, "tmdbId": 949 }]);

    let err = dump(&upstream, &Radarr(Ok(movies))).unwrap_err();

    assert!(matches!(err, Error::Write(_)));
    assert_eq!(read_to_string(&json_path).unwrap(), "OLD");
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("movie_list.json")]);
}
