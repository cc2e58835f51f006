//! Paginated fetching and multi-endpoint aggregation.
//!
//! Pages are requested one at a time with a fixed `numOfRows`. A page with
//! fewer items than requested is the last one. Failures end the current
//! endpoint and are reported through [`StopReason`], never as an `Err`.

use tracing::{info, instrument, warn};

use crate::config::PageQuery;
use crate::error::Result;
use crate::io::http::{Query, Transport};
use crate::io::{json, xml};
use crate::model::{FieldSpec, Record, RecordSchema};
use crate::normalize::RawItem;

/// Result code the XML endpoints return on success.
pub const SUCCESS_CODE: &str = "00";

/// Payload format of an endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// XML with a `resultCode` header, checked on every page.
    Xml,
    /// JSON with items under `response.body.items`.
    Json,
}

/// Why a fetch loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back with fewer items than requested.
    LastPage,
    /// A page came back with no items.
    NoItems,
    /// The API reported a non-success result code.
    ApiError {
        code: Option<String>,
        message: Option<String>,
    },
    /// Transport or parse failure.
    Failed(String),
}

impl StopReason {
    /// True when the loop reached the end of the result set.
    pub fn is_complete(&self) -> bool {
        matches!(self, StopReason::LastPage | StopReason::NoItems)
    }
}

/// Records collected from one endpoint plus how the loop ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<Record>,
    /// Number of page requests issued.
    pub pages_requested: u32,
    pub stop: StopReason,
}

enum Page {
    Items(Vec<RawItem>),
    ApiError {
        code: Option<String>,
        message: Option<String>,
    },
}

/// Pages through one endpoint at a time.
pub struct PaginatedFetcher<'a, T: Transport + ?Sized> {
    transport: &'a T,
    service_key: &'a str,
}

impl<'a, T: Transport + ?Sized> PaginatedFetcher<'a, T> {
    pub fn new(transport: &'a T, service_key: &'a str) -> Self {
        Self {
            transport,
            service_key,
        }
    }

    /// Fetches every page of `url` and normalizes each item with `schema`.
    #[instrument(level = "info", skip_all, fields(url = %url, ?format))]
    pub fn fetch_all<P: PageQuery + ?Sized>(
        &self,
        url: &str,
        format: ResponseFormat,
        params: &P,
        schema: &RecordSchema,
    ) -> FetchOutcome {
        let page_size = params.page_size();
        let search = params.search_query();
        let mut records = Vec::new();
        let mut page_no: u32 = 1;

        let stop = loop {
            info!(page_no, "requesting page");
            let query = self.page_query(page_size, page_no, &search);

            let page = match self
                .transport
                .get(url, &query)
                .and_then(|body| parse_page(&body, format))
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(page_no, error = %err, "page request failed; stopping");
                    break StopReason::Failed(err.to_string());
                }
            };

            let items = match page {
                Page::Items(items) => items,
                Page::ApiError { code, message } => {
                    warn!(
                        page_no,
                        code = code.as_deref().unwrap_or("<none>"),
                        message = message.as_deref().unwrap_or(""),
                        "API returned an error result"
                    );
                    break StopReason::ApiError { code, message };
                }
            };

            let count = items.len();
            records.extend(items.iter().map(|item| item.normalize(schema.fields)));

            if count == 0 {
                break StopReason::NoItems;
            }
            if count < page_size as usize {
                break StopReason::LastPage;
            }
            page_no += 1;
        };

        info!(records = records.len(), pages = page_no, "fetch finished");
        FetchOutcome {
            records,
            pages_requested: page_no,
            stop,
        }
    }

    fn page_query(&self, page_size: u32, page_no: u32, search: &Query) -> Query {
        let mut query = Vec::with_capacity(search.len() + 3);
        query.push(("ServiceKey".to_string(), self.service_key.to_string()));
        query.push(("numOfRows".to_string(), page_size.to_string()));
        query.push(("pageNo".to_string(), page_no.to_string()));
        query.extend(search.iter().cloned());
        query
    }
}

fn parse_page(body: &str, format: ResponseFormat) -> Result<Page> {
    match format {
        ResponseFormat::Xml => {
            let envelope = xml::parse_envelope(body)?;
            if envelope.result_code.as_deref() != Some(SUCCESS_CODE) {
                return Ok(Page::ApiError {
                    code: envelope.result_code,
                    message: envelope.result_msg,
                });
            }
            Ok(Page::Items(
                envelope.items.into_iter().map(RawItem::Xml).collect(),
            ))
        }
        ResponseFormat::Json => {
            let items = json::parse_items(body)?;
            Ok(Page::Items(items.into_iter().map(RawItem::Json).collect()))
        }
    }
}

/// Records gathered from several operations, projected onto the columns that
/// actually occur in them.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub records: Vec<Record>,
    /// Schema fields present in at least one record, in schema order.
    pub columns: Vec<FieldSpec>,
    /// Per-operation outcome, in operation order.
    pub endpoints: Vec<(String, StopReason)>,
}

/// Runs the fetcher against `{base_url}/{operation}` for each operation and
/// concatenates the results in operation order.
#[instrument(level = "info", skip_all, fields(base_url = %base_url, operations = operations.len()))]
pub fn aggregate<T: Transport + ?Sized, P: PageQuery + ?Sized>(
    fetcher: &PaginatedFetcher<'_, T>,
    base_url: &str,
    operations: &[String],
    format: ResponseFormat,
    params: &P,
    schema: &RecordSchema,
) -> Aggregated {
    let base = base_url.trim_end_matches('/');
    let mut records = Vec::new();
    let mut endpoints = Vec::with_capacity(operations.len());

    for operation in operations {
        info!(operation = %operation, "querying operation");
        let url = format!("{base}/{operation}");
        let outcome = fetcher.fetch_all(&url, format, params, schema);
        if !outcome.stop.is_complete() {
            warn!(
                operation = %operation,
                kept = outcome.records.len(),
                "operation failed; moving on"
            );
        }
        records.extend(outcome.records);
        endpoints.push((operation.clone(), outcome.stop));
    }

    let columns = present_columns(&records, schema);
    info!(
        records = records.len(),
        columns = columns.len(),
        "aggregation finished"
    );
    Aggregated {
        records,
        columns,
        endpoints,
    }
}

/// Schema fields that at least one record carries.
pub fn present_columns(records: &[Record], schema: &RecordSchema) -> Vec<FieldSpec> {
    schema
        .fields
        .iter()
        .filter(|spec| records.iter().any(|record| record.contains(spec.key)))
        .copied()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::config::{BidSearchParams, OrderPlanSearchParams};
    use crate::error::ToolError;
    use crate::model::{BID_NOTICE, ORDER_PLAN};

    /// Replays canned responses and records every request.
    pub(crate) struct ScriptedTransport {
        responses: RefCell<VecDeque<Result<String>>>,
        pub(crate) requests: RefCell<Vec<(String, Query)>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                requests: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, url: &str, query: &Query) -> Result<String> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), query.clone()));
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ToolError::Xml("script exhausted".into())))
        }
    }

    pub(crate) fn xml_page(code: &str, start: usize, count: usize) -> String {
        let mut body = format!(
            "<response><header><resultCode>{code}</resultCode>\
             <resultMsg>NORMAL SERVICE.</resultMsg></header><body><items>"
        );
        for n in start..start + count {
            body.push_str(&format!(
                "<item><bidNtceNo>R26BK{n:08}</bidNtceNo>\
                 <ntceInsttOfclEmailAdrs>ofcl{n}@korea.kr</ntceInsttOfclEmailAdrs></item>"
            ));
        }
        body.push_str("</items></body></response>");
        body
    }

    fn bid_params(num_of_rows: u32) -> BidSearchParams {
        BidSearchParams {
            num_of_rows,
            inqry_bgn_dt: "202601010000".into(),
            inqry_end_dt: "202601312359".into(),
            ..BidSearchParams::default()
        }
    }

    fn page_no(query: &Query) -> &str {
        query
            .iter()
            .find(|(key, _)| key == "pageNo")
            .map(|(_, value)| value.as_str())
            .expect("pageNo present")
    }

    #[test]
    fn stops_after_short_page() {
        let transport = ScriptedTransport::new(vec![
            Ok(xml_page("00", 0, 100)),
            Ok(xml_page("00", 100, 100)),
            Ok(xml_page("00", 200, 37)),
            Ok(xml_page("00", 237, 5)),
        ]);
        let fetcher = PaginatedFetcher::new(&transport, "key");
        let outcome = fetcher.fetch_all(
            "http://api.test/bids",
            ResponseFormat::Xml,
            &bid_params(100),
            &BID_NOTICE,
        );

        assert_eq!(transport.request_count(), 3);
        assert_eq!(outcome.pages_requested, 3);
        assert_eq!(outcome.records.len(), 237);
        assert_eq!(outcome.stop, StopReason::LastPage);
        assert_eq!(outcome.records[236].get("bidNtceNo"), "R26BK00000236");

        let requests = transport.requests.borrow();
        let pages: Vec<&str> = requests.iter().map(|(_, query)| page_no(query)).collect();
        assert_eq!(pages, ["1", "2", "3"]);
        for (_, query) in requests.iter() {
            assert!(query.contains(&("numOfRows".to_string(), "100".to_string())));
            assert!(query.contains(&("ServiceKey".to_string(), "key".to_string())));
        }
    }

    #[test]
    fn full_page_continues_and_empty_page_stops() {
        let transport = ScriptedTransport::new(vec![
            Ok(xml_page("00", 0, 2)),
            Ok(xml_page("00", 2, 2)),
            Ok(xml_page("00", 4, 0)),
        ]);
        let fetcher = PaginatedFetcher::new(&transport, "key");
        let outcome = fetcher.fetch_all("u", ResponseFormat::Xml, &bid_params(2), &BID_NOTICE);

        assert_eq!(transport.request_count(), 3);
        assert_eq!(outcome.records.len(), 4);
        assert_eq!(outcome.stop, StopReason::NoItems);
    }

    #[test]
    fn request_count_is_bounded() {
        for total in [0usize, 1, 9, 10, 11, 30] {
            let page_size = 10usize;
            let mut responses = Vec::new();
            let mut start = 0;
            loop {
                let count = page_size.min(total - start);
                responses.push(Ok(xml_page("00", start, count)));
                start += count;
                if count < page_size {
                    break;
                }
            }
            let transport = ScriptedTransport::new(responses);
            let fetcher = PaginatedFetcher::new(&transport, "key");
            let outcome =
                fetcher.fetch_all("u", ResponseFormat::Xml, &bid_params(10), &BID_NOTICE);

            assert_eq!(outcome.records.len(), total);
            assert!(transport.request_count() <= total.div_ceil(page_size) + 1);
        }
    }

    #[test]
    fn api_error_on_first_page_returns_nothing() {
        let body = "<OpenAPI_ServiceResponse><cmmMsgHeader><resultCode>99</resultCode>\
                    <resultMsg>SERVICE_KEY_IS_NOT_REGISTERED_ERROR</resultMsg>\
                    </cmmMsgHeader></OpenAPI_ServiceResponse>";
        let transport = ScriptedTransport::new(vec![Ok(body.to_string())]);
        let fetcher = PaginatedFetcher::new(&transport, "bad");
        let outcome = fetcher.fetch_all("u", ResponseFormat::Xml, &bid_params(100), &BID_NOTICE);

        assert!(outcome.records.is_empty());
        assert_eq!(transport.request_count(), 1);
        assert_eq!(
            outcome.stop,
            StopReason::ApiError {
                code: Some("99".into()),
                message: Some("SERVICE_KEY_IS_NOT_REGISTERED_ERROR".into()),
            }
        );
    }

    #[test]
    fn mid_run_failures_keep_earlier_pages() {
        let transport = ScriptedTransport::new(vec![
            Ok(xml_page("00", 0, 3)),
            Ok(xml_page("22", 3, 3)),
        ]);
        let fetcher = PaginatedFetcher::new(&transport, "key");
        let outcome = fetcher.fetch_all("u", ResponseFormat::Xml, &bid_params(3), &BID_NOTICE);
        assert_eq!(outcome.records.len(), 3);
        assert!(matches!(outcome.stop, StopReason::ApiError { .. }));

        let transport = ScriptedTransport::new(vec![
            Ok(xml_page("00", 0, 3)),
            Ok("<response><item>".to_string()),
        ]);
        let fetcher = PaginatedFetcher::new(&transport, "key");
        let outcome = fetcher.fetch_all("u", ResponseFormat::Xml, &bid_params(3), &BID_NOTICE);
        assert_eq!(outcome.records.len(), 3);
        assert!(matches!(outcome.stop, StopReason::Failed(_)));
    }

    #[test]
    fn transport_error_keeps_earlier_pages() {
        let transport = ScriptedTransport::new(vec![
            Ok(xml_page("00", 0, 3)),
            Err(ToolError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "request timed out",
            ))),
            Ok(xml_page("00", 3, 3)),
        ]);
        let fetcher = PaginatedFetcher::new(&transport, "key");
        let outcome = fetcher.fetch_all("u", ResponseFormat::Xml, &bid_params(3), &BID_NOTICE);

        assert_eq!(transport.request_count(), 2);
        assert_eq!(outcome.pages_requested, 2);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.records[2].get("bidNtceNo"), "R26BK00000002");
        match outcome.stop {
            StopReason::Failed(message) => assert!(message.contains("request timed out")),
            other => panic!("expected a failed stop, got {other:?}"),
        }
    }

    #[test]
    fn missing_result_code_is_an_api_error() {
        let transport = ScriptedTransport::new(vec![Ok(
            "<response><body><items><item><bidNtceNo>1</bidNtceNo></item></items></body></response>"
                .to_string(),
        )]);
        let fetcher = PaginatedFetcher::new(&transport, "key");
        let outcome = fetcher.fetch_all("u", ResponseFormat::Xml, &bid_params(3), &BID_NOTICE);
        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.stop,
            StopReason::ApiError {
                code: None,
                message: None
            }
        );
    }

    fn order_params(num_of_rows: u32) -> OrderPlanSearchParams {
        OrderPlanSearchParams {
            num_of_rows,
            order_bgn_ym: "202509".into(),
            order_end_ym: "202612".into(),
            inqry_bgn_dt: "202509010000".into(),
            inqry_end_dt: "202612312359".into(),
            ..OrderPlanSearchParams::default()
        }
    }

    #[test]
    fn aggregates_operations_in_order_and_drops_absent_columns() {
        let thing = r#"{"response":{"body":{"items":[
            {"bizNm":"서버 구매","sumOrderAmt":1000,"orderInsttNm":"조달청"},
            {"bizNm":"노트북 구매","orderInsttNm":"국세청"}
        ]}}}"#;
        let construction = r#"{"response":{"body":{"items":{"item":
            {"bizNm":"청사 신축","telNo":"042-000-0000"}
        }}}}"#;
        let transport = ScriptedTransport::new(vec![
            Ok(thing.to_string()),
            Err(ToolError::Xml("connection reset".into())),
            Ok(construction.to_string()),
        ]);
        let fetcher = PaginatedFetcher::new(&transport, "key");
        let operations: Vec<String> = ["thng", "servc", "cnstwk"]
            .iter()
            .map(|op| op.to_string())
            .collect();

        let aggregated = aggregate(
            &fetcher,
            "http://api.test/OrderPlanSttusService/",
            &operations,
            ResponseFormat::Json,
            &order_params(100),
            &ORDER_PLAN,
        );

        let urls: Vec<String> = transport
            .requests
            .borrow()
            .iter()
            .map(|(url, _)| url.clone())
            .collect();
        assert_eq!(
            urls,
            [
                "http://api.test/OrderPlanSttusService/thng",
                "http://api.test/OrderPlanSttusService/servc",
                "http://api.test/OrderPlanSttusService/cnstwk",
            ]
        );

        let names: Vec<&str> = aggregated
            .records
            .iter()
            .map(|record| record.get("bizNm"))
            .collect();
        assert_eq!(names, ["서버 구매", "노트북 구매", "청사 신축"]);

        let keys: Vec<&str> = aggregated.columns.iter().map(|spec| spec.key).collect();
        assert_eq!(keys, ["orderInsttNm", "bizNm", "sumOrderAmt", "telNo"]);
        assert!(matches!(aggregated.endpoints[1].1, StopReason::Failed(_)));
        assert!(aggregated.endpoints[2].1.is_complete());
    }

    #[test]
    fn json_query_carries_type_and_paging() {
        let transport = ScriptedTransport::new(vec![Ok(
            r#"{"response":{"body":{"items":[]}}}"#.to_string(),
        )]);
        let fetcher = PaginatedFetcher::new(&transport, "key");
        let outcome =
            fetcher.fetch_all("u", ResponseFormat::Json, &order_params(50), &ORDER_PLAN);
        assert_eq!(outcome.stop, StopReason::NoItems);

        let requests = transport.requests.borrow();
        let query = &requests[0].1;
        assert_eq!(query[0], ("ServiceKey".to_string(), "key".to_string()));
        assert!(query.contains(&("type".to_string(), "json".to_string())));
        assert!(query.contains(&("numOfRows".to_string(), "50".to_string())));
        assert_eq!(page_no(query), "1");
    }
}
