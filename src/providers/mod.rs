pub mod coingecko;
pub mod yahoo_finance;

const USER_AGENT: &str = "gat/1.0";

fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}
