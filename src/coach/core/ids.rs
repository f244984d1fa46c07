//! Typed identifiers for chat messages, food entries and requests.
//!
//! Ids never carry ordering: message order lives in the conversation store
//! and entry order in the ledger's timestamps. Build with the `uuid_v7`
//! feature to get time-ordered ids for records that land in `SQLite`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id source for records written by the coach.
#[must_use]
fn record_uuid() -> Uuid {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4()
    }
}

/// Id source for accounts, always random.
#[must_use]
fn account_uuid() -> Uuid {
    Uuid::new_v4()
}

macro_rules! coach_id {
    (
        $(#[$meta:meta])*
        $name:ident => $source:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Fresh id.
            #[must_use]
            pub fn new() -> Self {
                Self($source())
            }

            /// The wrapped UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

coach_id!(
    /// The person whose food is being logged.
    UserId => account_uuid
);

coach_id!(
    /// A user or coach message in some topic.
    MessageId => record_uuid
);

coach_id!(
    /// A row in the food ledger.
    FoodEntryId => record_uuid
);

coach_id!(
    /// Ties one submission to its log lines: user message, gateway call, reply.
    RequestId => record_uuid
);
