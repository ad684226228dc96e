// src/schema/filter.rs

use tracing::debug;

use super::Profile;
use crate::decode::MessageSet;

/// Drops message types that are not part of a [`Profile`].
///
/// Decoders emit buckets for undocumented or vendor-internal messages; those
/// are not meant for export.
#[derive(Debug, Clone)]
pub struct MessageFilter<'p> {
    profile: &'p Profile,
}

impl<'p> MessageFilter<'p> {
    pub fn new(profile: &'p Profile) -> Self {
        Self { profile }
    }

    pub fn is_known(&self, message_type: &str) -> bool {
        self.profile.contains(message_type)
    }

    /// Keep only profile message types. Row order inside each type is untouched.
    pub fn filter(&self, mut messages: MessageSet) -> MessageSet {
        messages.retain(|name| {
            let keep = self.is_known(name);
            if !keep {
                debug!(message_type = name, "dropping message type not in profile");
            }
            keep
        });
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{FieldValue, Record};

    fn row(n: i64) -> Record {
        Record::new().with("n", FieldValue::Int(n))
    }

    #[test]
    fn keeps_only_known_types_with_rows_intact() {
        let profile = Profile::from_names(["record", "lap", "session"]);
        let filter = MessageFilter::new(&profile);

        let mut set = MessageSet::new();
        set.push("record", row(1));
        set.push("record", row(2));
        set.push("record", row(3));
        set.push("lap", row(9));
        set.push("65280", row(0));
        set.push("unknown_bucket", row(0));

        let original = set.clone();
        let out = filter.filter(set);

        assert_eq!(out.message_types().collect::<Vec<_>>(), vec!["lap", "record"]);
        for name in out.message_types() {
            assert!(profile.contains(name));
            assert_eq!(out.get(name), original.get(name));
        }
    }

    #[test]
    fn empty_set_stays_empty() {
        let profile = Profile::builtin();
        let out = MessageFilter::new(&profile).filter(MessageSet::new());
        assert!(out.is_empty());
    }
}
