use std::time::Duration;

use g2b_export::config::{AppConfig, BidSearchParams};
use g2b_export::io::excel_read;
use g2b_export::io::http::HttpTransport;
use g2b_export::sync;
use mockito::Matcher;
use tempfile::tempdir;

fn xml_page(start: usize, count: usize) -> String {
    let mut body = String::from(
        "<response><header><resultCode>00</resultCode><resultMsg>NORMAL SERVICE.</resultMsg>\
         </header><body><items>",
    );
    for n in start..start + count {
        body.push_str(&format!(
            "<item><bidNtceNo>R26BK{n:08}</bidNtceNo><dminsttNm>기관{n}</dminsttNm></item>"
        ));
    }
    body.push_str("</items></body></response>");
    body
}

fn page_matcher(page: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("ServiceKey".into(), "test-key".into()),
        Matcher::UrlEncoded("numOfRows".into(), "2".into()),
        Matcher::UrlEncoded("pageNo".into(), page.into()),
        Matcher::UrlEncoded("inqryDiv".into(), "1".into()),
        Matcher::UrlEncoded("bidNtceNm".into(), "그래픽카드".into()),
    ])
}

#[test]
fn bid_notices_page_through_http() {
    let mut server = mockito::Server::new();
    let first = server
        .mock("GET", "/bids")
        .match_query(page_matcher("1"))
        .with_status(200)
        .with_header("content-type", "text/xml;charset=UTF-8")
        .with_body(xml_page(0, 2))
        .expect(1)
        .create();
    let second = server
        .mock("GET", "/bids")
        .match_query(page_matcher("2"))
        .with_status(200)
        .with_body(xml_page(2, 1))
        .expect(1)
        .create();

    let mut config = AppConfig::default();
    config.api.service_key = "test-key".into();
    config.bid_notices.url = format!("{}/bids", server.url());
    let search = BidSearchParams {
        num_of_rows: 2,
        inqry_bgn_dt: "202601010000".into(),
        inqry_end_dt: "202601312359".into(),
        bid_ntce_nm: Some("그래픽카드".into()),
        ..BidSearchParams::default()
    };

    let temp_dir = tempdir().expect("temporary directory");
    let output = temp_dir.path().join("bids.xlsx");
    let transport = HttpTransport::new(Duration::from_secs(5)).expect("client built");
    let summary = sync::bid_notices_to_excel(&transport, &config, &search, Some(&output))
        .expect("pipeline ran");

    first.assert();
    second.assert();
    assert_eq!(summary.records, 3);

    let table = excel_read::read_first_sheet(&output).expect("Excel read");
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[2][0], "R26BK00000002");
}

#[test]
fn order_plans_skip_failing_operation() {
    let mut server = mockito::Server::new();
    let goods = server
        .mock("GET", "/OrderPlanSttusService/goods")
        .match_query(Matcher::UrlEncoded("type".into(), "json".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"response":{"header":{"resultCode":"00"},"body":{"items":[
                {"bizNm":"서버 구매","orderInsttNm":"조달청","sumOrderAmt":120000000}
            ],"numOfRows":100,"pageNo":1,"totalCount":1}}}"#,
        )
        .create();
    let services = server
        .mock("GET", "/OrderPlanSttusService/services")
        .match_query(Matcher::Any)
        .with_status(500)
        .create();
    let works = server
        .mock("GET", "/OrderPlanSttusService/works")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"response":{"body":{"items":{"item":
                {"bizNm":"청사 신축","telNo":"042-481-0000"}
            }}}}"#,
        )
        .create();

    let mut config = AppConfig::default();
    config.api.service_key = "test-key".into();
    config.order_plans.base_url = format!("{}/OrderPlanSttusService", server.url());
    config.order_plans.operations = vec!["goods".into(), "services".into(), "works".into()];
    config.order_plans.search.order_bgn_ym = "202509".into();
    config.order_plans.search.order_end_ym = "202612".into();
    config.order_plans.search.inqry_bgn_dt = "202509010000".into();
    config.order_plans.search.inqry_end_dt = "202612312359".into();

    let temp_dir = tempdir().expect("temporary directory");
    let output = temp_dir.path().join("plans.xlsx");
    let transport = HttpTransport::new(Duration::from_secs(5)).expect("client built");
    let summary =
        sync::order_plans_to_excel(&transport, &config, Some(&output)).expect("pipeline ran");

    goods.assert();
    services.assert();
    works.assert();
    assert_eq!(summary.records, 2);

    let table = excel_read::read_first_sheet(&output).expect("Excel read");
    assert_eq!(
        table.columns,
        ["발주기관명", "사업명", "합계발주금액", "전화번호"]
    );
    assert_eq!(table.rows[0], ["조달청", "서버 구매", "120000000", ""]);
    assert_eq!(table.rows[1], ["", "청사 신축", "", "042-481-0000"]);
}
