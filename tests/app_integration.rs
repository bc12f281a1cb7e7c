use std::fs;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Mock CoinGecko server with one ranked market and one chart series.
    pub async fn create_coingecko_mock_server(
        markets_response: &str,
        coin_id: &str,
        chart_response: &str,
    ) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/coins/markets"))
            .respond_with(ResponseTemplate::new(200).set_body_string(markets_response))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/api/v3/coins/{coin_id}/market_chart/range")))
            .respond_with(ResponseTemplate::new(200).set_body_string(chart_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    /// Mock Yahoo server for one currency pair symbol.
    pub async fn create_yahoo_mock_server(symbol: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn write_config(
        config_file: &tempfile::NamedTempFile,
        coingecko_url: &str,
        yahoo_url: &str,
        data_path: &str,
    ) {
        let config_content = format!(
            r#"
providers:
  coingecko:
    base_url: {coingecko_url}
  yahoo:
    base_url: {yahoo_url}
currency: "USD"
data_path: "{data_path}"
"#
        );
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
    }
}

fn date(s: &str) -> chrono::NaiveDate {
    s.parse().unwrap()
}

#[test_log::test(tokio::test)]
async fn test_full_fetch_flow_with_mocks() {
    // One ranked coin; prices on 2024-01-01 and 2024-01-03 only.
    let markets_response = r#"[{"id": "bitcoin", "name": "Bitcoin", "market_cap": 800000000000}]"#;
    let chart_response = r#"{
        "prices": [
            [1704067200000, 100.0],
            [1704240000000, 110.0]
        ]
    }"#;
    let coingecko_server =
        test_utils::create_coingecko_mock_server(markets_response, "bitcoin", chart_response).await;

    // EUR has data; every other pair is unmatched and resolves to an empty
    // series via the 404 path.
    let yahoo_response = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704067200, 1704153600],
                "indicators": {
                    "quote": [{
                        "close": [0.9, 1.1]
                    }]
                }
            }]
        }
    }"#;
    let yahoo_server = test_utils::create_yahoo_mock_server("EURUSD=X", yahoo_response).await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(
        &config_file,
        &coingecko_server.uri(),
        &yahoo_server.uri(),
        data_dir.path().to_str().unwrap(),
    );

    let result = gat::run_command(
        gat::AppCommand::Fetch {
            start: date("2024-01-01"),
            end: date("2024-01-03"),
            base_currency: None,
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Fetch failed with: {:?}", result.err());

    // The run must have written through to the cache.
    let cache = gat::store::PriceCache::new(data_dir.path().join("cache"));
    cache.init().unwrap();

    let prices = cache
        .load_prices("bitcoin", date("2024-01-01"), date("2024-01-03"))
        .unwrap();
    assert_eq!(prices.len(), 2);
    assert_eq!(prices[0].value, Some(100.0));
    assert_eq!(prices[1].value, Some(110.0));

    let rates = cache
        .load_rates("EUR", date("2024-01-01"), date("2024-01-03"))
        .unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0].value, Some(0.9));

    // Pairs with no data anywhere leave no rows behind.
    let rates = cache
        .load_rates("JPY", date("2024-01-01"), date("2024-01-03"))
        .unwrap();
    assert!(rates.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_fetch_fails_when_ranking_query_fails() {
    // No mounted routes: the ranked markets query gets a 404 and the run
    // must surface a single terminal failure.
    let coingecko_server = wiremock::MockServer::start().await;
    let yahoo_server = wiremock::MockServer::start().await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(
        &config_file,
        &coingecko_server.uri(),
        &yahoo_server.uri(),
        data_dir.path().to_str().unwrap(),
    );

    let result = gat::run_command(
        gat::AppCommand::Fetch {
            start: date("2024-01-01"),
            end: date("2024-01-03"),
            base_currency: None,
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    assert!(result.is_err());
    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("Ranked markets query failed"), "{message}");
}

#[test_log::test(tokio::test)]
async fn test_history_command_reads_cached_series() {
    use gat::core::series::DailyPoint;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = gat::store::PriceCache::new(data_dir.path().join("cache"));
    cache.init().unwrap();
    cache
        .upsert_prices(
            "bitcoin",
            &[
                DailyPoint::new(date("2024-01-01"), Some(100.0)),
                DailyPoint::new(date("2024-01-02"), Some(110.0)),
            ],
        )
        .unwrap();

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
currency: "USD"
data_path: "{}"
"#,
        data_dir.path().to_str().unwrap()
    );
    fs::write(config_file.path(), config_content).expect("Failed to write config file");

    let result = gat::run_command(
        gat::AppCommand::History {
            asset: "bitcoin".to_string(),
            start: date("2024-01-01"),
            end: date("2024-01-31"),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "History failed with: {:?}", result.err());
}
