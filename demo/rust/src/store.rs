use crate::models::Account;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory account storage shared by every request of one process.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, username: &str) -> bool {
        self.accounts.read().contains_key(username)
    }

    pub fn get(&self, username: &str) -> Option<Account> {
        self.accounts.read().get(username).cloned()
    }

    /// Inserts or replaces the account, returning its username.
    pub fn save(&self, account: Account) -> String {
        let username = account.username.clone();
        self.accounts.write().insert(username.clone(), account);
        username
    }
}
