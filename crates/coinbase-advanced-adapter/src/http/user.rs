/*
[INPUT]:  Account identifiers and pagination cursor
[OUTPUT]: Portfolio accounts and balances
[POS]:    HTTP layer - user account endpoints (requires JWT)
[UPDATE]: When adding new account endpoints or changing response format
*/

use crate::http::{CoinbaseClient, Result};
use crate::types::{Account, AccountResponse, ListAccountsResponse};
use reqwest::Method;

impl CoinbaseClient {
    /// List accounts, one page at a time
    ///
    /// GET /api/v3/brokerage/accounts?limit={limit}&cursor={cursor}
    pub async fn list_accounts(
        &self,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<ListAccountsResponse> {
        let mut builder = self
            .authed_request(Method::GET, "/api/v3/brokerage/accounts")
            .await?;
        if let Some(limit) = limit {
            builder = builder.query(&[("limit", limit)]);
        }
        if let Some(cursor) = cursor.filter(|cursor| !cursor.is_empty()) {
            builder = builder.query(&[("cursor", cursor)]);
        }

        self.send_json(builder).await
    }

    /// GET /api/v3/brokerage/accounts/{account_uuid}
    pub async fn get_account(&self, account_uuid: &str) -> Result<Account> {
        let endpoint = format!("/api/v3/brokerage/accounts/{account_uuid}");
        let builder = self.authed_request(Method::GET, &endpoint).await?;
        let response: AccountResponse = self.send_json(builder).await?;
        Ok(response.account)
    }
}
