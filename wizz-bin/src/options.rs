use crate::input_file::InputFile;
use crate::verbosity::Verbosity;
use anyhow::{Context, Error, Result, anyhow};
use clap::builder::PossibleValuesParser;
use clap::{Parser, builder::TypedValueParser};
use const_format::formatcp;
use http::{
    HeaderMap,
    header::{HeaderName, HeaderValue},
};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use std::{fs, path::PathBuf, str::FromStr, time::Duration};
use strum::{Display, EnumString, VariantNames};
use wizz_lib::DEFAULT_USER_AGENT;
use wizz_lib::ratelimit::{DEFAULT_BURST_SIZE, DEFAULT_REQUESTS_PER_SECOND, HostConfigs};
use wizz_lib::retry::{DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES};

pub(crate) const WIZZ_CONFIG_FILE: &str = "wizz.toml";

const DEFAULT_RETRY_WAIT_TIME: &str = "1s";

// We use a custom help message here because we want to show the default
// value of the config file, but also be able to check if the user has
// provided a custom value. If they didn't, we won't throw an error if
// the file doesn't exist.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    WIZZ_CONFIG_FILE,
);

/// The format results are printed in
#[derive(
    Debug, Deserialize, Default, Clone, Display, EnumString, VariantNames, PartialEq, Eq,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub(crate) enum OutputFormat {
    /// JSON bodies as compact JSON, other bodies as text, `-` for failures
    #[default]
    Plain,
    /// Every result as a JSON value, `null` for failures
    Json,
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    requests_per_second: f64 = DEFAULT_REQUESTS_PER_SECOND;
    burst_size: u32 = DEFAULT_BURST_SIZE;
    max_retries: u32 = DEFAULT_MAX_RETRIES;
    retry_wait_time: Duration = DEFAULT_INITIAL_DELAY;
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Parse a single header into a [`HeaderName`] and [`HeaderValue`]
///
/// Headers are expected to be in format `Header-Name: Header-Value`.
/// The header name and value are trimmed of whitespace.
///
/// If the header contains multiple colons, the part after the first colon is
/// considered the value.
fn parse_single_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    let Some((name, value)) = header.split_once(':') else {
        return Err(anyhow!(
            "Invalid header format. Expected colon-separated string in the format 'HeaderName: HeaderValue'"
        ));
    };

    let name = name.trim();
    let name = HeaderName::from_str(name)
        .map_err(|e| anyhow!("Unable to convert header name '{name}': {e}"))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| anyhow!("Unable to read value of header with name '{name}': {e}"))?;
    Ok((name, value))
}

/// Parses a single HTTP header into a tuple of (String, String)
#[derive(Clone, Debug)]
struct HeaderParser;

impl TypedValueParser for HeaderParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        _cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let invalid = |message: String| {
            clap::Error::raw(clap::error::ErrorKind::InvalidValue, format!("{message}\n"))
        };

        let header_str = value
            .to_str()
            .ok_or_else(|| invalid("Header value contains invalid UTF-8".into()))?;
        let (name, value) = parse_single_header(header_str).map_err(|e| invalid(e.to_string()))?;
        let value = value
            .to_str()
            .map_err(|_| invalid("Header value contains invalid UTF-8".into()))?;

        Ok((name.to_string(), value.to_string()))
    }
}

impl clap::builder::ValueParserFactory for HeaderParser {
    type Parser = HeaderParser;
    fn value_parser() -> Self::Parser {
        HeaderParser
    }
}

/// Extension trait for converting a Vec of header pairs to a `HeaderMap`
pub(crate) trait HeaderMapExt {
    /// Convert a collection of header key-value pairs to a `HeaderMap`
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error>;
}

impl HeaderMapExt for HeaderMap {
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("Invalid header value '{value}': {e}"))?;
            header_map.insert(header_name, header_value);
        }
        Ok(header_map)
    }
}

/// wizz fetches many URLs at once without overwhelming the servers behind
/// them. Requests are paced per host, failures are retried with backoff,
/// and results are printed in input order.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct WizzOptions {
    /// URLs to fetch
    #[arg(
        name = "urls",
        required_unless_present = "input_file",
        long_help = "URLs to fetch, e.g. `https://example.com/api/items`.
Alternatively, use `--input-file` to read URLs from a file.

NOTE: Use `--` to separate URLs from options that allow multiple arguments."
    )]
    raw_urls: Vec<String>,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

impl WizzOptions {
    /// All URLs to fetch: the arguments first, then the URLs from
    /// `--input-file`
    pub(crate) fn urls(&self) -> Result<Vec<String>> {
        let mut urls = self.raw_urls.clone();

        if let Some(path) = &self.config.input_file {
            let input_file = InputFile::try_from(path.as_path())
                .context("Cannot read URLs from --input-file")?;
            urls.extend(input_file.urls);
        }

        Ok(urls)
    }
}

// Custom deserializer function for the header field
fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(map.into_iter().collect())
}

/// The main configuration for wizz
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Read URLs from the given file or stdin (if path is '-').
    #[arg(
        long,
        value_name = "PATH",
        long_help = "Read URLs from the given file or stdin (if path is '-').

Examples:

    wizz --input-file urls.txt
    cat urls.txt | wizz --input-file -

File Format:
- Each line should contain one URL.
- Lines starting with '#' are treated as comments and ignored.
- Empty lines are also ignored."
    )]
    #[serde(default)]
    pub(crate) input_file: Option<PathBuf>,

    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Do not show progress bar.
    /// This is recommended for non-interactive shells (e.g. for continuous integration)
    #[arg(short, long, verbatim_doc_comment)]
    #[serde(default)]
    pub(crate) no_progress: bool,

    /// Output format of the results
    #[arg(short, long, default_value = "plain", value_parser = PossibleValuesParser::new(OutputFormat::VARIANTS).map(|s| s.parse::<OutputFormat>().unwrap_or_default()))]
    #[serde(default)]
    pub(crate) format: OutputFormat,

    /// Maximum number of requests per second for hosts without an entry
    /// in the `hosts` table of the configuration file
    #[arg(long = "rps", value_name = "N", default_value_t = DEFAULT_REQUESTS_PER_SECOND)]
    #[serde(default = "requests_per_second")]
    pub(crate) requests_per_second: f64,

    /// Number of requests sent at once before pacing applies
    #[arg(long = "burst", value_name = "N", default_value_t = DEFAULT_BURST_SIZE)]
    #[serde(default = "burst_size")]
    pub(crate) burst_size: u32,

    /// Maximum number of retries per request
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    #[serde(default = "max_retries")]
    pub(crate) max_retries: u32,

    /// Wait time before the first retry, e.g. `500ms` or `2s`.
    /// Doubles with every further retry unless `--no-exponential-backoff` is set.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = DEFAULT_RETRY_WAIT_TIME,
        verbatim_doc_comment
    )]
    #[serde(default = "retry_wait_time", with = "humantime_serde")]
    pub(crate) retry_wait_time: Duration,

    /// Wait the same time before every retry
    #[arg(long)]
    #[serde(default)]
    pub(crate) no_exponential_backoff: bool,

    /// Status code that warrants a retry. Can be given multiple times.
    /// [default: 429 and all 5xx]
    #[arg(
        long,
        value_name = "CODE",
        value_parser = clap::value_parser!(u16).range(100..1000),
        verbatim_doc_comment
    )]
    #[serde(default)]
    pub(crate) retry_status: Vec<u16>,

    /// Set custom header for requests
    #[arg(
        short = 'H',
        long = "header",
        // Note: We use a `Vec<(String, String)>` for headers, which is
        // unfortunate. The reason is that `clap::ArgAction::Append` collects
        // multiple values, and `clap` cannot automatically convert these tuples
        // into a `HashMap<String, String>`.
        action = clap::ArgAction::Append,
        value_parser = HeaderParser,
        value_name = "HEADER:VALUE",
        long_help = "Set custom header for requests

You can specify custom headers in the format 'Name: Value'. For example, 'Accept: application/json'.
Multiple headers can be specified by using the flag multiple times.
The specified headers are used for ALL requests."
    )]
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub(crate) header: Vec<(String, String)>,

    /// Timeout per request, e.g. `10s`
    #[arg(short, long, value_parser = humantime::parse_duration)]
    #[serde(default, with = "humantime_serde")]
    pub(crate) timeout: Option<Duration>,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Proceed for server connections considered insecure (invalid TLS)
    #[arg(short, long)]
    #[serde(default)]
    pub(crate) insecure: bool,

    /// Send all requests through this proxy
    #[arg(long, value_name = "URL")]
    #[serde(default)]
    pub(crate) proxy: Option<String>,

    /// Number of threads to utilize.
    /// Defaults to number of cores available to the system
    #[arg(short = 'T', long)]
    #[serde(default)]
    pub(crate) threads: Option<usize>,

    /// Per-host rate limits, keyed by hostname or `hostname:port`
    #[arg(skip)]
    #[serde(default)]
    pub(crate) hosts: HostConfigs,
}

impl Config {
    /// Special handling for merging headers
    ///
    /// Overwrites existing headers in `self` with the values from `other`.
    fn merge_headers(&mut self, other: &[(String, String)]) {
        let self_map = self.header.iter().cloned().collect::<HashMap<_, _>>();
        let other_map = other.iter().cloned().collect::<HashMap<_, _>>();

        // Merge the two maps, with `other` taking precedence
        let merged_map: HashMap<_, _> = self_map.into_iter().chain(other_map).collect();

        self.header = merged_map.into_iter().collect();
    }

    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        self.merge_headers(&toml.header);

        // Hosts configuration is only available in TOML, there is no
        // command-line syntax for it
        self.hosts = toml.hosts;

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..header,
                ..hosts,

                // Keys with defaults to assign
                input_file: None,
                verbose: Verbosity::default(),
                no_progress: false,
                format: OutputFormat::default(),
                requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
                burst_size: DEFAULT_BURST_SIZE,
                max_retries: DEFAULT_MAX_RETRIES,
                retry_wait_time: DEFAULT_INITIAL_DELAY,
                no_exponential_backoff: false,
                retry_status: Vec::<u16>::new(),
                timeout: None,
                user_agent: DEFAULT_USER_AGENT,
                insecure: false,
                proxy: None,
                threads: None,
            }
        }
    }
}
