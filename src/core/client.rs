//! Sequence client
//!
//! [`SequenceService`] is the request/response capability the pipeline
//! consumes: one call per batch, blocking. [`EnsemblClient`] implements it
//! against the Ensembl REST API.
//!
//! Responses are matched back to regions by the region key echoed in each
//! entry, never by position, since the service does not promise to keep
//! request order.

use crate::core::assemble::SequenceResult;
use crate::core::batch::Batch;
use crate::core::dna::is_nucleotide_sequence;
use crate::core::error::{RetrievalError, RetrievalResult};
use crate::core::region::{RegionKey, Strand};
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Public Ensembl REST server
pub const DEFAULT_SERVER: &str = "https://rest.ensembl.org";

/// Per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Ensembl allows 15 requests per second for anonymous clients
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 15;

/// Species and assembly the sequences are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeRef {
    pub species: String,
    pub assembly: String,
}

impl GenomeRef {
    pub fn new(species: impl Into<String>, assembly: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            assembly: assembly.into(),
        }
    }
}

/// Format a region the way the sequence endpoint expects: `1:90..205:-1`
pub fn format_region_query(key: &RegionKey) -> String {
    format!(
        "{}:{}..{}:{}",
        key.chromosome,
        key.start,
        key.end,
        key.strand.ensembl_code()
    )
}

/// Parse a region string as echoed in a response's `query` field
///
/// The strand suffix is optional and defaults to forward.
///
/// # Examples
/// ```
/// use getseq::core::{parse_region_query, Strand};
///
/// let key = parse_region_query("X:1000..2000:-1").unwrap();
/// assert_eq!(key.chromosome, "X");
/// assert_eq!((key.start, key.end), (1000, 2000));
/// assert_eq!(key.strand, Strand::Reverse);
/// ```
pub fn parse_region_query(query: &str) -> Option<RegionKey> {
    let query = query.trim();
    let (location, strand) = match query.rsplit_once(':') {
        Some((head, tail)) if !tail.contains("..") => (head, Strand::from_ensembl(tail)?),
        _ => (query, Strand::Forward),
    };
    let (chromosome, range) = location.rsplit_once(':')?;
    let (start, end) = range.split_once("..")?;
    if chromosome.is_empty() {
        return None;
    }
    Some(RegionKey {
        chromosome: chromosome.to_string(),
        start: start.parse().ok()?,
        end: end.parse().ok()?,
        strand,
    })
}

/// Parse a sequence id such as `chromosome:GRCh38:1:90:205:1`
pub fn parse_sequence_id(id: &str) -> Option<RegionKey> {
    let mut parts = id.trim().rsplitn(4, ':');
    let strand = Strand::from_ensembl(parts.next()?)?;
    let end = parts.next()?.parse().ok()?;
    let start = parts.next()?.parse().ok()?;
    let chromosome = parts.next()?.rsplit(':').next()?;
    if chromosome.is_empty() {
        return None;
    }
    Some(RegionKey {
        chromosome: chromosome.to_string(),
        start,
        end,
        strand,
    })
}

/// One entry of a sequence response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceSequence {
    /// Echo of the requested region string
    pub query: Option<String>,
    pub id: Option<String>,
    /// Kept as raw JSON so a non-string payload can be reported
    pub seq: Option<Value>,
}

impl ServiceSequence {
    /// Entry with a `query` echo and a string sequence
    pub fn new(query: impl Into<String>, seq: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            id: None,
            seq: Some(Value::String(seq.into())),
        }
    }

    /// Region this entry answers, from `query` or else from `id`
    pub fn key(&self) -> Option<RegionKey> {
        self.query
            .as_deref()
            .and_then(parse_region_query)
            .or_else(|| self.id.as_deref().and_then(parse_sequence_id))
    }

    /// Validated nucleotide sequence
    pub fn sequence(&self) -> RetrievalResult<String> {
        let malformed = |reason: &str| Err(RetrievalError::MalformedResponse(reason.to_string()));
        match &self.seq {
            None | Some(Value::Null) => malformed("missing sequence field"),
            Some(Value::String(s)) if s.is_empty() => malformed("empty sequence"),
            Some(Value::String(s)) if is_nucleotide_sequence(s) => Ok(s.clone()),
            Some(Value::String(_)) => malformed("sequence contains non-nucleotide characters"),
            Some(_) => malformed("sequence field is not a string"),
        }
    }
}

/// Synchronous sequence lookup, one call per batch
pub trait SequenceService {
    /// Fetch sequences for a set of regions.
    ///
    /// `Err` means the whole request failed. A region missing from an `Ok`
    /// response is reported against that region alone.
    fn fetch_sequences(
        &mut self,
        genome: &GenomeRef,
        regions: &[RegionKey],
    ) -> RetrievalResult<Vec<ServiceSequence>>;
}

fn index_response(records: Vec<ServiceSequence>) -> HashMap<RegionKey, RetrievalResult<String>> {
    let mut by_key = HashMap::with_capacity(records.len());
    for record in records {
        match record.key() {
            Some(key) => {
                by_key.entry(key).or_insert_with(|| record.sequence());
            }
            None => debug!(
                "Ignoring response entry without a recognizable region (query={:?}, id={:?})",
                record.query, record.id
            ),
        }
    }
    by_key
}

/// Fetch one batch and map every entry to a result
///
/// Never fails as a whole: a failed request marks every region of the
/// batch with the same error.
pub fn fetch_batch<'a, S>(
    service: &mut S,
    genome: &GenomeRef,
    batch: &Batch<'a>,
) -> Vec<SequenceResult<'a>>
where
    S: SequenceService + ?Sized,
{
    let keys: Vec<RegionKey> = batch.entries().iter().map(|e| e.region.key()).collect();

    match service.fetch_sequences(genome, &keys) {
        Err(err) => {
            warn!("Batch of {} regions failed: {}", batch.size(), err);
            batch
                .entries()
                .iter()
                .map(|e| SequenceResult::new(e.index, e.region, Err(err.clone())))
                .collect()
        }
        Ok(records) => {
            let by_key = index_response(records);
            batch
                .entries()
                .iter()
                .zip(&keys)
                .map(|(e, key)| {
                    let outcome = by_key
                        .get(key)
                        .cloned()
                        .unwrap_or(Err(RetrievalError::NoData));
                    SequenceResult::new(e.index, e.region, outcome)
                })
                .collect()
        }
    }
}

/// Fixed-window request throttle
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    window_start: Option<Instant>,
    count: u32,
}

impl RateLimiter {
    /// `0` disables throttling
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            max_per_window: requests_per_second,
            window: Duration::from_secs(1),
            window_start: None,
            count: 0,
        }
    }

    /// Record a request issued at `now`, returning how long to wait first
    pub fn acquire_at(&mut self, now: Instant) -> Duration {
        if self.max_per_window == 0 {
            return Duration::ZERO;
        }

        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= self.window {
            self.window_start = Some(now);
            self.count = 1;
            return Duration::ZERO;
        }
        if self.count < self.max_per_window {
            self.count += 1;
            return Duration::ZERO;
        }

        let wait = self.window - elapsed;
        self.window_start = Some(now + wait);
        self.count = 1;
        wait
    }

    pub fn acquire(&mut self) {
        let wait = self.acquire_at(Instant::now());
        if !wait.is_zero() {
            debug!("Rate limit reached, sleeping {:?}", wait);
            std::thread::sleep(wait);
        }
    }
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: String,
    pub timeout: Duration,
    pub requests_per_second: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

/// Entry of `GET info/species`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeciesInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpeciesList {
    #[serde(default)]
    species: Vec<SpeciesInfo>,
}

#[derive(Debug, Deserialize)]
struct AssemblyInfo {
    #[serde(default)]
    coord_system_versions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RegionsRequest {
    regions: Vec<String>,
}

/// Body Ensembl sends along with a rejected request
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: String,
}

fn service_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ServiceErrorBody>(body)
        .ok()
        .map(|b| b.error.trim().to_string())
        .filter(|m| !m.is_empty())
}

/// Turn a status and body into the expected payload
///
/// A non-success status keeps the service's `error` text when present. A
/// body that does not match `T` fails as a malformed response.
fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> RetrievalResult<T> {
    if !(200..300).contains(&status) {
        return Err(RetrievalError::Http {
            status,
            message: service_error_message(body),
        });
    }
    serde_json::from_str(body).map_err(|e| RetrievalError::MalformedResponse(e.to_string()))
}

fn classify_error(err: reqwest::Error) -> RetrievalError {
    if err.is_timeout() {
        RetrievalError::Timeout
    } else if let Some(status) = err.status() {
        RetrievalError::Http {
            status: status.as_u16(),
            message: None,
        }
    } else if err.is_decode() {
        RetrievalError::MalformedResponse(err.to_string())
    } else {
        RetrievalError::Network(err.to_string())
    }
}

/// Blocking Ensembl REST client
pub struct EnsemblClient {
    http: Client,
    server: String,
    limiter: RateLimiter,
}

impl EnsemblClient {
    pub fn new(config: &ClientConfig) -> RetrievalResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("getseq/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(classify_error)?;
        Ok(Self {
            http,
            server: config.server.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(config.requests_per_second),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.server, endpoint)
    }

    fn send<T: DeserializeOwned>(&mut self, request: RequestBuilder) -> RetrievalResult<T> {
        self.limiter.acquire();
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(classify_error)?;
        decode_response(status, &body)
    }

    /// Available genomes, sorted by name
    pub fn species(&mut self) -> RetrievalResult<Vec<SpeciesInfo>> {
        let request = self.http.get(self.url("/info/species"));
        let mut list: SpeciesList = self.send(request)?;
        list.species.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list.species)
    }

    /// Assembly versions available for one species
    pub fn assemblies(&mut self, species: &str) -> RetrievalResult<Vec<String>> {
        let request = self.http.get(self.url(&format!("/info/assembly/{}", species)));
        let info: AssemblyInfo = self.send(request)?;
        Ok(info.coord_system_versions)
    }
}

impl SequenceService for EnsemblClient {
    fn fetch_sequences(
        &mut self,
        genome: &GenomeRef,
        regions: &[RegionKey],
    ) -> RetrievalResult<Vec<ServiceSequence>> {
        let body = RegionsRequest {
            regions: regions.iter().map(format_region_query).collect(),
        };
        debug!(
            "POST sequence/region/{} ({} regions, assembly {})",
            genome.species,
            regions.len(),
            genome.assembly
        );
        let request = self
            .http
            .post(self.url(&format!("/sequence/region/{}", genome.species)))
            .query(&[("coord_system_version", genome.assembly.as_str())])
            .json(&body);
        self.send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::{plan_batches, BatchLimits};
    use crate::core::region::RegionRecord;

    fn key(chrom: &str, start: u64, end: u64, strand: Strand) -> RegionKey {
        RegionKey {
            chromosome: chrom.to_string(),
            start,
            end,
            strand,
        }
    }

    /// Answers with scripted responses, one per call
    struct ScriptedService {
        responses: Vec<RetrievalResult<Vec<ServiceSequence>>>,
        requests: Vec<Vec<RegionKey>>,
    }

    impl SequenceService for ScriptedService {
        fn fetch_sequences(
            &mut self,
            _genome: &GenomeRef,
            regions: &[RegionKey],
        ) -> RetrievalResult<Vec<ServiceSequence>> {
            self.requests.push(regions.to_vec());
            self.responses.remove(0)
        }
    }

    fn regions() -> Vec<RegionRecord> {
        vec![
            RegionRecord::new("chr1", 90, 205, Strand::Forward, None, 1).unwrap(),
            RegionRecord::new("2", 45, 70, Strand::Reverse, None, 2).unwrap(),
            RegionRecord::new("X", 1, 4, Strand::Forward, None, 3).unwrap(),
        ]
    }

    #[test]
    fn test_format_region_query() {
        assert_eq!(format_region_query(&key("1", 90, 205, Strand::Forward)), "1:90..205:1");
        assert_eq!(format_region_query(&key("2", 45, 70, Strand::Reverse)), "2:45..70:-1");
    }

    #[test]
    fn test_parse_region_query() {
        assert_eq!(parse_region_query("1:90..205:1"), Some(key("1", 90, 205, Strand::Forward)));
        assert_eq!(parse_region_query("2:45..70:-1"), Some(key("2", 45, 70, Strand::Reverse)));
        assert_eq!(parse_region_query("MT:5..9"), Some(key("MT", 5, 9, Strand::Forward)));
        assert_eq!(parse_region_query("1:90-205:1"), None);
        assert_eq!(parse_region_query("1:90..205:2"), None);
        assert_eq!(parse_region_query(":1..2:1"), None);
        assert_eq!(parse_region_query("garbage"), None);
    }

    #[test]
    fn test_parse_sequence_id() {
        assert_eq!(
            parse_sequence_id("chromosome:GRCh38:1:90:205:1"),
            Some(key("1", 90, 205, Strand::Forward))
        );
        assert_eq!(
            parse_sequence_id("chromosome:GRCh37:X:10:20:-1"),
            Some(key("X", 10, 20, Strand::Reverse))
        );
        assert_eq!(parse_sequence_id("1:10:20"), None);
    }

    #[test]
    fn test_service_sequence_key_falls_back_to_id() {
        let entry = ServiceSequence {
            query: None,
            id: Some("chromosome:GRCh38:2:45:70:-1".into()),
            seq: Some(Value::String("ACGT".into())),
        };
        assert_eq!(entry.key(), Some(key("2", 45, 70, Strand::Reverse)));
    }

    #[test]
    fn test_service_sequence_validation() {
        assert_eq!(ServiceSequence::new("1:1..4:1", "ACGT").sequence(), Ok("ACGT".into()));

        let mut entry = ServiceSequence::new("1:1..4:1", "");
        assert!(entry.sequence().unwrap_err().is_malformed());

        entry.seq = Some(Value::from(42));
        assert_eq!(
            entry.sequence(),
            Err(RetrievalError::MalformedResponse("sequence field is not a string".into()))
        );

        entry.seq = None;
        assert!(entry.sequence().unwrap_err().is_malformed());

        entry.seq = Some(Value::String("AC{GT".into()));
        assert!(entry.sequence().unwrap_err().is_malformed());
    }

    #[test]
    fn test_deserialize_response() {
        let body = r#"[
            {"id": "chromosome:GRCh38:1:90:205:1", "query": "1:90..205:1", "seq": "ACGT", "molecule": "dna"},
            {"id": "chromosome:GRCh38:2:45:70:-1", "seq": null}
        ]"#;
        let entries: Vec<ServiceSequence> = serde_json::from_str(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence(), Ok("ACGT".into()));
        assert_eq!(entries[1].key(), Some(key("2", 45, 70, Strand::Reverse)));
        assert!(entries[1].sequence().is_err());
    }

    #[test]
    fn test_fetch_batch_matches_by_key_not_order() {
        let regions = regions();
        let batches = plan_batches(&regions, &BatchLimits::default()).unwrap();
        let mut service = ScriptedService {
            responses: vec![Ok(vec![
                ServiceSequence::new("X:1..4:1", "TTTT"),
                ServiceSequence::new("2:45..70:-1", "GGGG"),
                ServiceSequence::new("1:90..205:1", "AAAA"),
            ])],
            requests: Vec::new(),
        };

        let results = fetch_batch(&mut service, &GenomeRef::new("human", "GRCh38"), &batches[0]);
        let seqs: Vec<_> = results.iter().map(|r| r.sequence().unwrap().to_string()).collect();
        assert_eq!(seqs, vec!["AAAA", "GGGG", "TTTT"]);
        assert_eq!(service.requests[0][0], key("1", 90, 205, Strand::Forward));
    }

    #[test]
    fn test_fetch_batch_omission_is_no_data() {
        let regions = regions();
        let batches = plan_batches(&regions, &BatchLimits::default()).unwrap();
        let mut service = ScriptedService {
            responses: vec![Ok(vec![
                ServiceSequence::new("1:90..205:1", "AAAA"),
                ServiceSequence::new("X:1..4:1", "TTTT"),
            ])],
            requests: Vec::new(),
        };

        let results = fetch_batch(&mut service, &GenomeRef::new("human", "GRCh38"), &batches[0]);
        assert_eq!(results[0].sequence(), Some("AAAA"));
        assert_eq!(results[1].error(), Some(&RetrievalError::NoData));
        assert_eq!(results[2].sequence(), Some("TTTT"));
    }

    #[test]
    fn test_fetch_batch_whole_batch_failure() {
        let regions = regions();
        let batches = plan_batches(&regions, &BatchLimits::default()).unwrap();
        let mut service = ScriptedService {
            responses: vec![Err(RetrievalError::Http {
                status: 503,
                message: None,
            })],
            requests: Vec::new(),
        };

        let results = fetch_batch(&mut service, &GenomeRef::new("human", "GRCh38"), &batches[0]);
        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| matches!(r.error(), Some(RetrievalError::Http { status: 503, .. }))));
    }

    #[test]
    fn test_decode_non_array_body_is_malformed() {
        let err = decode_response::<Vec<ServiceSequence>>(200, r#"{"seq": "ACGT"}"#).unwrap_err();
        assert!(err.is_malformed());

        let err = decode_response::<Vec<ServiceSequence>>(200, "<html>busy</html>").unwrap_err();
        assert!(err.is_malformed());

        let ok = decode_response::<Vec<ServiceSequence>>(200, r#"[{"query": "1:1..4:1", "seq": "ACGT"}]"#);
        assert_eq!(ok.unwrap()[0].sequence(), Ok("ACGT".into()));
    }

    #[test]
    fn test_decode_error_status_keeps_service_message() {
        let body = r#"{"error": "Cannot request a slice whose end is greater than 248956422"}"#;
        assert_eq!(
            decode_response::<Vec<ServiceSequence>>(400, body),
            Err(RetrievalError::Http {
                status: 400,
                message: Some("Cannot request a slice whose end is greater than 248956422".into()),
            })
        );
        assert_eq!(
            decode_response::<Vec<ServiceSequence>>(503, "Service Unavailable"),
            Err(RetrievalError::Http {
                status: 503,
                message: None,
            })
        );
    }

    #[test]
    fn test_classify_request_error() {
        // an unparseable URL fails before anything is sent
        let err = Client::new().get("not a url").send().unwrap_err();
        assert!(matches!(classify_error(err), RetrievalError::Network(_)));
    }

    #[test]
    fn test_rate_limiter() {
        let mut limiter = RateLimiter::new(2);
        let t0 = Instant::now();
        assert_eq!(limiter.acquire_at(t0), Duration::ZERO);
        assert_eq!(limiter.acquire_at(t0), Duration::ZERO);
        assert_eq!(limiter.acquire_at(t0), Duration::from_secs(1));

        // the third request opened a new window at t0 + 1s
        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(limiter.acquire_at(t1), Duration::ZERO);
        assert_eq!(limiter.acquire_at(t1 + Duration::from_millis(400)), Duration::from_millis(600));

        // an idle window resets the budget
        let t2 = t1 + Duration::from_secs(5);
        assert_eq!(limiter.acquire_at(t2), Duration::ZERO);
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let mut limiter = RateLimiter::new(0);
        let now = Instant::now();
        for _ in 0..100 {
            assert_eq!(limiter.acquire_at(now), Duration::ZERO);
        }
    }

    #[test]
    fn test_client_trims_server() {
        let config = ClientConfig {
            server: "http://localhost:3000/".into(),
            ..ClientConfig::default()
        };
        let client = EnsemblClient::new(&config).unwrap();
        assert_eq!(client.server(), "http://localhost:3000");
        assert_eq!(client.url("/info/species"), "http://localhost:3000/info/species");
    }
}
