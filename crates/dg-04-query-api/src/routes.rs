//! Endpoint catalogue and the generic lookup handler.
//!
//! Every endpoint is either a current-value lookup (latest entry matching
//! the path identifiers) or a paginated list. A [`Lookup`] row maps path
//! parameters onto document fields; the handler does the rest.

use std::collections::HashMap;
use std::time::Duration;

use axum::http::Uri;
use axum::response::Response;
use dg_01_document_store::{collections, Document, Filter};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::errors::ApiError;
use crate::domain::hal::{with_query, Hal};
use crate::domain::page::PageRequest;
use crate::queries::DigestQueries;
use crate::service::{respond, AppState, Reply};

/// TTL of a full page fetched with an explicit offset.
pub const FILLED_PAGE_TTL: Duration = Duration::from_secs(60);

const FAST: Duration = Duration::from_millis(500);
const SHORT: Duration = Duration::from_secs(1);
const DEFAULT: Duration = Duration::from_secs(3);

/// Path parameter bound to a document field.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub field: &'static str,
    /// Decimal index without leading zeros.
    pub numeric: bool,
}

const fn text(name: &'static str) -> Param {
    Param {
        name,
        field: name,
        numeric: false,
    }
}

const fn index(name: &'static str, field: &'static str) -> Param {
    Param {
        name,
        field,
        numeric: true,
    }
}

/// Field a list is ordered and paged by.
#[derive(Debug, Clone, Copy)]
pub struct Ordering {
    pub field: &'static str,
    pub numeric: bool,
}

#[derive(Debug)]
pub struct Lookup {
    pub path: &'static str,
    pub collection: &'static str,
    /// Named in not-found problems.
    pub what: &'static str,
    pub params: &'static [Param],
    /// Constant boolean fields added to the filter.
    pub fixed: &'static [(&'static str, bool)],
    pub ttl: Duration,
    /// Set for paginated lists.
    pub ordering: Option<Ordering>,
}

const fn current(
    path: &'static str,
    collection: &'static str,
    what: &'static str,
    params: &'static [Param],
    ttl: Duration,
) -> Lookup {
    Lookup {
        path,
        collection,
        what,
        params,
        fixed: &[],
        ttl,
        ordering: None,
    }
}

const fn list(
    path: &'static str,
    collection: &'static str,
    what: &'static str,
    params: &'static [Param],
    ordering: Ordering,
    ttl: Duration,
) -> Lookup {
    Lookup {
        path,
        collection,
        what,
        params,
        fixed: &[],
        ttl,
        ordering: Some(ordering),
    }
}

pub static LOOKUPS: &[Lookup] = &[
    current(
        "/block/:height",
        collections::BLOCK,
        "block",
        &[index("height", "height")],
        DEFAULT,
    ),
    list(
        "/block/:height/operations",
        collections::OPERATION,
        "operations",
        &[index("height", "height")],
        Ordering {
            field: "index",
            numeric: true,
        },
        DEFAULT,
    ),
    current(
        "/operation/:fact_hash",
        collections::OPERATION,
        "operation",
        &[text("fact_hash")],
        DEFAULT,
    ),
    current(
        "/currency/:currency",
        collections::CURRENCY,
        "currency design",
        &[text("currency")],
        DEFAULT,
    ),
    current(
        "/account/:address",
        collections::ACCOUNT,
        "account",
        &[text("address")],
        FAST,
    ),
    current(
        "/account/:address/balance/:currency",
        collections::BALANCE,
        "balance",
        &[text("address"), text("currency")],
        FAST,
    ),
    current(
        "/nft/:contract/collection",
        collections::NFT_COLLECTION,
        "nft collection",
        &[text("contract")],
        DEFAULT,
    ),
    list(
        "/nft/:contract/nfts",
        collections::NFT,
        "nfts",
        &[text("contract")],
        Ordering {
            field: "nft_id",
            numeric: true,
        },
        SHORT,
    ),
    current(
        "/nft/:contract/nft/:id",
        collections::NFT,
        "nft",
        &[text("contract"), index("id", "nft_id")],
        SHORT,
    ),
    current(
        "/nft/:contract/account/:address/operators",
        collections::NFT_OPERATOR,
        "nft operators",
        &[text("contract"), text("address")],
        SHORT,
    ),
    current(
        "/did/:contract/service",
        collections::DID_ISSUER,
        "credential service",
        &[text("contract")],
        DEFAULT,
    ),
    current(
        "/did/:contract/template/:template",
        collections::DID_TEMPLATE,
        "credential template",
        &[text("contract"), text("template")],
        DEFAULT,
    ),
    list(
        "/did/:contract/template/:template/credentials",
        collections::DID_CREDENTIAL,
        "credentials",
        &[text("contract"), text("template")],
        Ordering {
            field: "credential_id",
            numeric: false,
        },
        DEFAULT,
    ),
    current(
        "/did/:contract/template/:template/credential/:credential_id",
        collections::DID_CREDENTIAL,
        "credential",
        &[text("contract"), text("template"), text("credential_id")],
        DEFAULT,
    ),
    current(
        "/did/:contract/holder/:holder",
        collections::DID_HOLDER_DID,
        "holder did",
        &[text("contract"), text("holder")],
        DEFAULT,
    ),
    Lookup {
        fixed: &[("is_item", false)],
        ..current(
            "/timestamp/:contract/service",
            collections::TIMESTAMP,
            "timestamp service",
            &[text("contract")],
            DEFAULT,
        )
    },
    Lookup {
        fixed: &[("is_item", true)],
        ..current(
            "/timestamp/:contract/project/:project/id/:idx",
            collections::TIMESTAMP,
            "timestamp item",
            &[text("contract"), text("project"), index("idx", "timestamp_idx")],
            DEFAULT,
        )
    },
    current(
        "/token/:contract",
        collections::TOKEN,
        "token design",
        &[text("contract")],
        FAST,
    ),
    current(
        "/token/:contract/account/:address",
        collections::TOKEN_BALANCE,
        "token balance",
        &[text("contract"), text("address")],
        FAST,
    ),
    current(
        "/point/:contract",
        collections::POINT,
        "point design",
        &[text("contract")],
        FAST,
    ),
    current(
        "/point/:contract/account/:address",
        collections::POINT_BALANCE,
        "point balance",
        &[text("contract"), text("address")],
        FAST,
    ),
    current(
        "/dao/:contract/service",
        collections::DAO,
        "dao design",
        &[text("contract")],
        SHORT,
    ),
    current(
        "/dao/:contract/proposal/:proposal_id",
        collections::DAO_PROPOSAL,
        "proposal",
        &[text("contract"), text("proposal_id")],
        SHORT,
    ),
    current(
        "/dao/:contract/proposal/:proposal_id/delegators",
        collections::DAO_DELEGATORS,
        "delegators",
        &[text("contract"), text("proposal_id")],
        SHORT,
    ),
    current(
        "/dao/:contract/proposal/:proposal_id/voters",
        collections::DAO_VOTERS,
        "voters",
        &[text("contract"), text("proposal_id")],
        SHORT,
    ),
    current(
        "/dao/:contract/proposal/:proposal_id/votingpower",
        collections::DAO_VOTING_POWER_BOX,
        "voting power box",
        &[text("contract"), text("proposal_id")],
        SHORT,
    ),
    current(
        "/sto/:contract/service",
        collections::STO,
        "sto design",
        &[text("contract")],
        SHORT,
    ),
    current(
        "/sto/:contract/holder/:holder/partitions",
        collections::STO_HOLDER_PARTITIONS,
        "holder partitions",
        &[text("contract"), text("holder")],
        SHORT,
    ),
    current(
        "/sto/:contract/holder/:holder/partition/:partition/balance",
        collections::STO_HOLDER_PARTITION_BALANCE,
        "holder partition balance",
        &[text("contract"), text("holder"), text("partition")],
        SHORT,
    ),
    current(
        "/sto/:contract/holder/:holder/partition/:partition/operators",
        collections::STO_HOLDER_PARTITION_OPERATORS,
        "holder partition operators",
        &[text("contract"), text("holder"), text("partition")],
        SHORT,
    ),
    current(
        "/sto/:contract/partition/:partition/balance",
        collections::STO_PARTITION_BALANCE,
        "partition balance",
        &[text("contract"), text("partition")],
        SHORT,
    ),
    current(
        "/sto/:contract/operator/:operator/holders",
        collections::STO_OPERATOR_HOLDERS,
        "operator holders",
        &[text("contract"), text("operator")],
        SHORT,
    ),
];

/// Raw list query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub offset: Option<String>,
    pub reverse: Option<String>,
    pub limit: Option<String>,
}

/// Trimmed, non-empty path parameter.
pub fn required<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ApiError> {
    match params.get(name).map(|s| s.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ApiError::empty_param(name)),
    }
}

/// Decimal index. Leading zeros are rejected so each index has one spelling.
pub fn parse_index(name: &str, raw: &str) -> Result<u64, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::empty_param(name));
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(ApiError::BadRequest(format!("invalid {name}, {raw:?}")));
    }
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {name}, {raw:?}")))
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("1" | "true"))
}

impl Lookup {
    fn filter(&self, params: &HashMap<String, String>) -> Result<Filter, ApiError> {
        let mut filter = Filter::All;
        for param in self.params {
            let raw = required(params, param.name)?;
            let value: Value = if param.numeric {
                parse_index(param.name, raw)?.into()
            } else {
                raw.into()
            };
            filter = filter.and(Filter::eq(param.field, value));
        }
        for (field, value) in self.fixed {
            filter = filter.and(Filter::eq(*field, *value));
        }
        Ok(filter)
    }

    fn page(&self, ordering: Ordering, query: &ListQuery) -> Result<PageRequest, ApiError> {
        let mut page = PageRequest::forward().reversed(parse_bool(query.reverse.as_deref()));

        if let Some(raw) = query.offset.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
            page = if ordering.numeric {
                page.with_offset(parse_index("offset", raw)?)
            } else {
                page.with_offset(raw)
            };
        }
        // Unparsable limits fall back to the default page size.
        if let Some(limit) = query.limit.as_deref().and_then(|l| l.trim().parse().ok()) {
            page = page.with_limit(limit);
        }
        Ok(page)
    }
}

/// Answer `lookup` for one request.
pub async fn serve_lookup(
    lookup: &'static Lookup,
    state: AppState,
    uri: Uri,
    params: HashMap<String, String>,
    query: ListQuery,
) -> Response {
    let path = uri.path().to_string();

    let prepared = lookup.filter(&params).and_then(|filter| match lookup.ordering {
        None => Ok((filter, None)),
        Some(ordering) => Ok((filter, Some((ordering, lookup.page(ordering, &query)?)))),
    });

    let queries = state.queries.clone();
    respond(&state, &uri, async move {
        let (filter, paging) = prepared?;
        match paging {
            None => find_current(&queries, lookup, filter, path).await,
            Some((ordering, page)) => find_page(&queries, lookup, filter, ordering, page, path).await,
        }
    })
    .await
}

async fn find_current(
    queries: &DigestQueries,
    lookup: &Lookup,
    filter: Filter,
    path: String,
) -> Result<Reply, ApiError> {
    let doc = queries
        .current(lookup.collection, &filter)
        .await?
        .ok_or_else(|| ApiError::NotFound(lookup.what.to_string()))?;

    Ok(Reply {
        hal: Hal::new(Value::Object(doc), path),
        ttl: lookup.ttl,
    })
}

async fn find_page(
    queries: &DigestQueries,
    lookup: &Lookup,
    filter: Filter,
    ordering: Ordering,
    page: PageRequest,
    path: String,
) -> Result<Reply, ApiError> {
    let docs = queries
        .list(lookup.collection, filter, ordering.field, &page)
        .await?;
    if docs.is_empty() {
        return Err(ApiError::NotFound(lookup.what.to_string()));
    }

    let filled = docs.len() == queries.page_limit(&page);
    let hal = page_hal(&path, &page, ordering, &docs);
    let ttl = if filled && page.offset.is_some() {
        FILLED_PAGE_TTL
    } else {
        lookup.ttl
    };

    Ok(Reply { hal, ttl })
}

fn offset_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Envelope of one page with `self`, `next` and `reverse` links.
fn page_hal(path: &str, page: &PageRequest, ordering: Ordering, docs: &[Document]) -> Hal {
    let reverse_pair = ("reverse", "true".to_string());

    let mut self_query = Vec::new();
    if let Some(offset) = &page.offset {
        self_query.push(("offset", offset_text(offset)));
    }
    if page.reverse {
        self_query.push(reverse_pair.clone());
    }

    let embedded: Vec<Value> = docs.iter().cloned().map(Value::Object).collect();
    let mut hal = Hal::new(embedded, with_query(path, &self_query));

    if let Some(last) = docs.last().and_then(|d| d.get(ordering.field)) {
        let mut next_query = vec![("offset", offset_text(last))];
        if page.reverse {
            next_query.push(reverse_pair);
        }
        hal = hal.with_link("next", with_query(path, &next_query));
    }

    hal.with_link(
        "reverse",
        with_query(path, &[("reverse", (!page.reverse).to_string())]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lookup(path: &str) -> &'static Lookup {
        LOOKUPS.iter().find(|l| l.path == path).unwrap()
    }

    #[test]
    fn test_paths_unique() {
        let paths: HashSet<_> = LOOKUPS.iter().map(|l| l.path).collect();
        assert_eq!(paths.len(), LOOKUPS.len());
    }

    #[test]
    fn test_every_param_appears_in_path() {
        for l in LOOKUPS {
            for p in l.params {
                assert!(l.path.contains(&format!(":{}", p.name)), "{}", l.path);
            }
        }
    }

    #[test]
    fn test_index_rejects_leading_zero() {
        assert_eq!(parse_index("id", "0").unwrap(), 0);
        assert_eq!(parse_index("id", "120").unwrap(), 120);
        assert!(matches!(parse_index("id", "012"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_index("id", "x"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_index("id", " "), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_filter_maps_params_to_fields() {
        let filter = lookup("/nft/:contract/nft/:id")
            .filter(&params(&[("contract", "CA1"), ("id", "42")]))
            .unwrap();
        assert_eq!(
            filter,
            Filter::All
                .and(Filter::eq("contract", "CA1"))
                .and(Filter::eq("nft_id", 42u64))
        );
    }

    #[test]
    fn test_filter_adds_fixed_fields() {
        let filter = lookup("/timestamp/:contract/service")
            .filter(&params(&[("contract", "CA1")]))
            .unwrap();
        assert_eq!(
            filter,
            Filter::All
                .and(Filter::eq("contract", "CA1"))
                .and(Filter::eq("is_item", false))
        );
    }

    #[test]
    fn test_blank_param_is_bad_request() {
        let err = lookup("/token/:contract")
            .filter(&params(&[("contract", "  ")]))
            .unwrap_err();
        assert_eq!(err, ApiError::empty_param("contract"));
    }

    #[test]
    fn test_page_parsing() {
        let nfts = lookup("/nft/:contract/nfts");
        let ordering = nfts.ordering.unwrap();
        let query = ListQuery {
            offset: Some("7".into()),
            reverse: Some("true".into()),
            limit: Some("abc".into()),
        };
        let page = nfts.page(ordering, &query).unwrap();
        assert_eq!(page, PageRequest::forward().with_offset(7u64).reversed(true));

        let bad = ListQuery {
            offset: Some("07".into()),
            ..Default::default()
        };
        assert!(nfts.page(ordering, &bad).is_err());
    }

    #[test]
    fn test_page_links() {
        let docs: Vec<Document> = [3u64, 4]
            .iter()
            .map(|id| {
                let mut d = Document::new();
                d.insert("nft_id".into(), (*id).into());
                d
            })
            .collect();
        let ordering = Ordering {
            field: "nft_id",
            numeric: true,
        };

        let hal = page_hal(
            "/nft/CA1/nfts",
            &PageRequest::forward().with_offset(2u64),
            ordering,
            &docs,
        );
        assert_eq!(hal.link("self"), Some("/nft/CA1/nfts?offset=2"));
        assert_eq!(hal.link("next"), Some("/nft/CA1/nfts?offset=4"));
        assert_eq!(hal.link("reverse"), Some("/nft/CA1/nfts?reverse=true"));

        let hal = page_hal("/nft/CA1/nfts", &PageRequest::forward().reversed(true), ordering, &docs);
        assert_eq!(hal.link("self"), Some("/nft/CA1/nfts?reverse=true"));
        assert_eq!(hal.link("next"), Some("/nft/CA1/nfts?offset=4&reverse=true"));
        assert_eq!(hal.link("reverse"), Some("/nft/CA1/nfts?reverse=false"));
    }
}
