//! Fixed user roster and instrument catalog handed to the generator and router.

use super::{Symbol, Username};

/// A portfolio owner: login name plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: Username,
    pub name: String,
}

impl User {
    pub fn new(username: &str, name: &str) -> Self {
        User {
            username: Username::new(username),
            name: name.to_string(),
        }
    }
}

/// Closed set of users and tradable instruments for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    users: Vec<User>,
    instruments: Vec<Symbol>,
}

const DEMO_USERS: [(&str, &str); 5] = [
    ("mike", "Michael Jones"),
    ("stacy", "Stacy Malibu"),
    ("john", "John Doe"),
    ("marie", "Marie Condo"),
    ("tom", "Tomas Train"),
];

const DEMO_INSTRUMENTS: [&str; 28] = [
    "ETSY", "PINS", "SE", "SHOP", "SQ", "MELI", "ISRG", "DIS", "BRK.A", "AMZN", "VOO", "VEA",
    "VGT", "VIG", "MBB", "QQQ", "SPY", "BSV", "BND", "MUB", "VSMPX", "VFIAX", "FXAIX", "VTSAX",
    "SPAXX", "VMFXX", "FDRXX", "FGXX",
];

impl Catalog {
    pub fn new(users: Vec<User>, instruments: Vec<Symbol>) -> Self {
        Catalog { users, instruments }
    }

    /// The five demo users and 28 instruments the app ships with.
    pub fn demo() -> Self {
        Catalog {
            users: DEMO_USERS
                .iter()
                .map(|(username, name)| User::new(username, name))
                .collect(),
            instruments: DEMO_INSTRUMENTS.iter().map(|s| Symbol::new(*s)).collect(),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn instruments(&self) -> &[Symbol] {
        &self.instruments
    }

    pub fn has_instrument(&self, symbol: &str) -> bool {
        self.instruments.iter().any(|s| s.as_str() == symbol)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::demo()
    }
}
