//! URL template catalog implementing the [`EndpointCatalog`] port.
//!
//! A catalog holds one base URL template and one path template per endpoint.
//! `{name}` placeholders are filled from catalog constants first, then from
//! the request arguments. Arguments that fill no placeholder become query
//! parameters, and `api_key` is always appended last.

use std::collections::{BTreeMap, BTreeSet};

use url::Url;

use crate::domain::ports::{EndpointCatalog, EndpointCatalogError};
use crate::domain::{ArgumentSet, EndpointId};

/// Platforms served by the Riot API.
pub const RIOT_REGIONS: [&str; 11] = [
    "br", "eune", "euw", "jp", "kr", "lan", "las", "na", "oce", "ru", "tr",
];

const RIOT_BASE_TEMPLATE: &str = "https://{region}.api.pvp.net";

/// One parsed template: literal text interleaved with placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Template {
    pieces: Vec<Piece>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Placeholder(String),
}

impl Template {
    fn parse(raw: &str) -> Result<Self, EndpointCatalogError> {
        let invalid = |message: &str| EndpointCatalogError::invalid_template(raw, message);
        let mut pieces = Vec::new();
        let mut rest = raw;
        while let Some(open) = rest.find('{') {
            let (literal, tail) = rest.split_at(open);
            if literal.contains('}') {
                return Err(invalid("unmatched `}`"));
            }
            if !literal.is_empty() {
                pieces.push(Piece::Literal(literal.to_owned()));
            }
            let close = tail.find('}').ok_or_else(|| invalid("unclosed `{`"))?;
            let name = tail.get(1..close).unwrap_or_default().trim();
            if name.is_empty() || name.contains('{') {
                return Err(invalid("placeholders need a name"));
            }
            pieces.push(Piece::Placeholder(name.to_owned()));
            rest = tail.get(close + 1..).unwrap_or_default();
        }
        if rest.contains('}') {
            return Err(invalid("unmatched `}`"));
        }
        if !rest.is_empty() {
            pieces.push(Piece::Literal(rest.to_owned()));
        }
        Ok(Self { pieces })
    }
}

/// Template-driven endpoint catalog.
///
/// # Examples
/// ```
/// use harvester::domain::ports::EndpointCatalog;
/// use harvester::domain::{ArgumentSet, EndpointId};
/// use harvester::outbound::endpoint_catalog::TemplateEndpointCatalog;
///
/// let catalog = TemplateEndpointCatalog::riot("secret", "EUW").expect("known region");
/// let url = catalog
///     .build_url(
///         &EndpointId::new("match").expect("valid endpoint"),
///         &ArgumentSet::new().with("matchId", 2_000_i64),
///     )
///     .expect("url builds");
/// assert_eq!(
///     url.as_str(),
///     "https://euw.api.pvp.net/api/lol/euw/v2.2/match/2000?api_key=secret",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct TemplateEndpointCatalog {
    base: Template,
    constants: BTreeMap<String, String>,
    endpoints: BTreeMap<String, Template>,
    api_key: Option<String>,
}

impl TemplateEndpointCatalog {
    /// Start a catalog from a base URL template such as `https://{region}.example`.
    pub fn new(base_template: &str) -> Result<Self, EndpointCatalogError> {
        Ok(Self {
            base: Template::parse(base_template.trim_end_matches('/'))?,
            constants: BTreeMap::new(),
            endpoints: BTreeMap::new(),
            api_key: None,
        })
    }

    /// Riot API preset for `region`, with the `match` and `champion` endpoints.
    pub fn riot(api_key: &str, region: &str) -> Result<Self, EndpointCatalogError> {
        Self::riot_with_base(api_key, region, RIOT_BASE_TEMPLATE)
    }

    /// Riot API preset served from a different base template.
    pub fn riot_with_base(
        api_key: &str,
        region: &str,
        base_template: &str,
    ) -> Result<Self, EndpointCatalogError> {
        let region = region.trim().to_lowercase();
        if !RIOT_REGIONS.contains(&region.as_str()) {
            return Err(EndpointCatalogError::unknown_region(region));
        }
        Self::new(base_template)?
            .with_constant("region", region)
            .with_api_key(api_key)
            .with_endpoint("match", "/api/lol/{region}/v2.2/match/{matchId}")?
            .with_endpoint("champion", "/api/lol/{region}/v1.2/champion/{id}")
    }

    /// Bind a catalog-wide placeholder value.
    #[must_use]
    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    /// Set the key appended as `api_key` to every URL.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Register an endpoint path template. Names are matched case-insensitively.
    pub fn with_endpoint(
        mut self,
        endpoint: &str,
        path_template: &str,
    ) -> Result<Self, EndpointCatalogError> {
        let template = Template::parse(path_template)?;
        self.endpoints
            .insert(endpoint.trim().to_lowercase(), template);
        Ok(self)
    }

    /// Registered endpoint names.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    fn render(
        &self,
        endpoint: &EndpointId,
        template: &Template,
        arguments: &ArgumentSet,
        consumed: &mut BTreeSet<String>,
        out: &mut String,
    ) -> Result<(), EndpointCatalogError> {
        for piece in &template.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Placeholder(name) => {
                    if let Some(value) = self.constants.get(name) {
                        out.push_str(value);
                    } else if let Some(value) = arguments.get(name) {
                        let value = value.to_string();
                        let segment = escape_path_segment(&value).ok_or_else(|| {
                            EndpointCatalogError::invalid_url(value.as_str(), "unencodable path segment")
                        })?;
                        out.push_str(&segment);
                        consumed.insert(name.clone());
                    } else {
                        return Err(EndpointCatalogError::missing_argument(
                            endpoint.as_str(),
                            name.as_str(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Percent-encode `value` as a single URL path segment (`/` and spaces escaped).
fn escape_path_segment(value: &str) -> Option<String> {
    let mut scratch = Url::parse("http://segment.invalid/").ok()?;
    scratch.path_segments_mut().ok()?.clear().push(value);
    scratch.path().strip_prefix('/').map(str::to_owned)
}

impl EndpointCatalog for TemplateEndpointCatalog {
    fn build_url(
        &self,
        endpoint: &EndpointId,
        arguments: &ArgumentSet,
    ) -> Result<Url, EndpointCatalogError> {
        let template = self
            .endpoints
            .get(&endpoint.as_str().to_lowercase())
            .ok_or_else(|| EndpointCatalogError::unknown_endpoint(endpoint.as_str()))?;

        let mut consumed = BTreeSet::new();
        let mut raw = String::new();
        self.render(endpoint, &self.base, arguments, &mut consumed, &mut raw)?;
        self.render(endpoint, template, arguments, &mut consumed, &mut raw)?;

        let mut url = Url::parse(&raw)
            .map_err(|error| EndpointCatalogError::invalid_url(raw.as_str(), error.to_string()))?;
        let extras: Vec<(&str, String)> = arguments
            .iter()
            .filter(|(name, _)| !consumed.contains(*name))
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        if !extras.is_empty() || self.api_key.is_some() {
            let mut query = url.query_pairs_mut();
            for (name, value) in &extras {
                query.append_pair(name, value);
            }
            if let Some(api_key) = &self.api_key {
                query.append_pair("api_key", api_key);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    //! Template parsing and URL construction.
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn riot() -> TemplateEndpointCatalog {
        TemplateEndpointCatalog::riot("RGAPI-key", "na").expect("known region")
    }

    fn id(name: &str) -> EndpointId {
        EndpointId::new(name).expect("valid endpoint")
    }

    #[rstest]
    fn champion_endpoint_uses_v1_2_path(riot: TemplateEndpointCatalog) {
        let url = riot
            .build_url(&id("Champion"), &ArgumentSet::new().with("id", 266_i64))
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://na.api.pvp.net/api/lol/na/v1.2/champion/266?api_key=RGAPI-key"
        );
    }

    #[rstest]
    fn extra_arguments_become_query_parameters_before_the_key(riot: TemplateEndpointCatalog) {
        let args = ArgumentSet::new()
            .with("matchId", 5_i64)
            .with("includeTimeline", true);
        let url = riot.build_url(&id("match"), &args).expect("url builds");
        assert_eq!(
            url.query(),
            Some("includeTimeline=true&api_key=RGAPI-key")
        );
    }

    #[rstest]
    fn unknown_endpoint_is_rejected(riot: TemplateEndpointCatalog) {
        let err = riot
            .build_url(&id("summoner"), &ArgumentSet::new())
            .expect_err("unknown endpoint");
        assert_eq!(err, EndpointCatalogError::unknown_endpoint("summoner"));
    }

    #[rstest]
    fn missing_placeholder_argument_is_rejected(riot: TemplateEndpointCatalog) {
        let err = riot
            .build_url(&id("match"), &ArgumentSet::new().with("id", 1_i64))
            .expect_err("missing matchId");
        assert_eq!(
            err,
            EndpointCatalogError::missing_argument("match", "matchId")
        );
    }

    #[rstest]
    #[case("xx")]
    #[case("")]
    #[case("europe")]
    fn unknown_regions_are_rejected(#[case] region: &str) {
        let err = TemplateEndpointCatalog::riot("key", region).expect_err("unknown region");
        assert!(matches!(err, EndpointCatalogError::UnknownRegion { .. }));
    }

    #[rstest]
    #[case("/a/{id")]
    #[case("/a/id}")]
    #[case("/a/{}")]
    #[case("/a/{ {b}")]
    fn malformed_templates_are_rejected(#[case] template: &str) {
        let err = TemplateEndpointCatalog::new("https://example.test")
            .and_then(|catalog| catalog.with_endpoint("x", template))
            .expect_err("invalid template");
        assert!(matches!(err, EndpointCatalogError::InvalidTemplate { .. }));
    }

    #[rstest]
    fn text_arguments_are_escaped_in_paths() {
        let catalog = TemplateEndpointCatalog::new("https://example.test/")
            .and_then(|catalog| catalog.with_endpoint("search", "/by-name/{name}"))
            .expect("valid catalog");
        let url = catalog
            .build_url(&id("search"), &ArgumentSet::new().with("name", "a/b c"))
            .expect("url builds");
        assert_eq!(url.path(), "/by-name/a%2Fb%20c");
        assert_eq!(url.query(), None);
    }

    #[rstest]
    #[case::space("a b", "a%20b")]
    #[case::plus("a+b", "a+b")]
    #[case::question_mark("why?", "why%3F")]
    #[case::hash("c#", "c%23")]
    fn path_segments_use_percent_encoding(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_path_segment(raw).as_deref(), Some(expected));
    }

    #[rstest]
    fn base_template_that_is_not_a_url_is_rejected() {
        let catalog = TemplateEndpointCatalog::new("not a url")
            .and_then(|catalog| catalog.with_endpoint("x", "/x"))
            .expect("templates parse");
        let err = catalog
            .build_url(&id("x"), &ArgumentSet::new())
            .expect_err("invalid url");
        assert!(matches!(err, EndpointCatalogError::InvalidUrl { .. }));
    }

    #[rstest]
    fn base_override_keeps_riot_paths() {
        let catalog =
            TemplateEndpointCatalog::riot_with_base("k", "kr", "http://127.0.0.1:8080")
                .expect("known region");
        let url = catalog
            .build_url(&id("match"), &ArgumentSet::new().with("matchId", 1_i64))
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/api/lol/kr/v2.2/match/1?api_key=k"
        );
        assert_eq!(catalog.endpoints().collect::<Vec<_>>(), vec!["champion", "match"]);
    }
}
