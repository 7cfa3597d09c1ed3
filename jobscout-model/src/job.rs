//! Job postings as they arrive on the stream and as they are displayed.

/// A posting payload normalized at the stream boundary.
///
/// Text fields keep `None` when the payload omitted them or carried an empty
/// or non-string value; display defaults are applied by [`JobEntry`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobPosting {
    pub url: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub region: Option<String>,
    /// First score found by the ordered accessors; zero counts as absent.
    pub score: Option<f64>,
}

/// One displayed row in a region bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobEntry {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub summary: String,
    /// Two-decimal score, or empty when the posting had no usable score.
    pub score: String,
    #[cfg_attr(feature = "serde", serde(rename = "outboundSaved"))]
    pub outbound_saved: bool,
}

impl JobEntry {
    pub fn from_posting(posting: JobPosting) -> Self {
        let JobPosting {
            url,
            title,
            company,
            location,
            summary,
            score,
            ..
        } = posting;

        JobEntry {
            title: title.unwrap_or_else(|| url.clone()),
            url,
            company: company.unwrap_or_default(),
            location: location.unwrap_or_default(),
            summary: summary.unwrap_or_default(),
            score: format_score(score),
            outbound_saved: false,
        }
    }
}

/// Renders a score with exactly two decimals; absent scores render blank.
///
/// An exact half at the third decimal rounds away from zero, so `0.125`
/// renders `0.13`.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(value) if value.is_finite() && value != 0.0 => {
            format!("{:.2}", round_half_away(value))
        }
        _ => String::new(),
    }
}

fn round_half_away(value: f64) -> f64 {
    // Only multiples of 1/8 can sit exactly on a tie.
    if (value.abs() * 8.0).fract() != 0.0 {
        return value;
    }
    ((value.abs() * 100.0 + 0.5).floor() / 100.0).copysign(value)
}

#[cfg(feature = "serde")]
mod decode {
    use super::JobPosting;
    use serde_json::Value;

    type ScoreAccessor = (&'static str, fn(&Value) -> Option<&Value>);

    fn filter_score(job: &Value) -> Option<&Value> {
        job.get("filter")?.get("score")
    }

    fn top_level_score(job: &Value) -> Option<&Value> {
        job.get("score")
    }

    fn classification_score(job: &Value) -> Option<&Value> {
        job.get("classification")?.get("score")
    }

    /// Payload shapes that may carry a score, most specific first. The first
    /// accessor yielding a non-null value decides, even if that value turns
    /// out to be unusable.
    pub(super) const SCORE_ACCESSORS: [ScoreAccessor; 3] = [
        ("filter.score", filter_score),
        ("score", top_level_score),
        ("classification.score", classification_score),
    ];

    fn resolve_score(job: &Value) -> Option<f64> {
        let raw = SCORE_ACCESSORS
            .iter()
            .find_map(|(_, accessor)| accessor(job).filter(|v| !v.is_null()))?;

        let value = match raw {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };

        (value.is_finite() && value != 0.0).then_some(value)
    }

    fn text(job: &Value, key: &str) -> Option<String> {
        job.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }

    impl JobPosting {
        /// Normalizes a raw `data.job` payload. Returns `None` when the
        /// payload is not an object.
        pub fn from_value(job: &Value) -> Option<Self> {
            if !job.is_object() {
                return None;
            }

            Some(JobPosting {
                url: text(job, "url").unwrap_or_default(),
                title: text(job, "title"),
                company: text(job, "company"),
                location: text(job, "location"),
                summary: text(job, "summary"),
                region: text(job, "region"),
                score: resolve_score(job),
            })
        }
    }
}
