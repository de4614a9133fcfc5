//! Event matching and group key derivation
//!
//! A group key identifies one label-value combination inside a collection.
//!
//! Key format: `<label>␟<value>␟<label>␟<value>␟...`
//!
//! where `␟` is the ASCII unit separator (0x1F). Labels are written in the
//! collection's declared order; the key is never sorted or canonicalized.
//! Values are escaped (`\` → `\\`, `␟` → `\␟`) so two different
//! label-value combinations can never produce the same key.

use crate::event::Event;

/// Separator between key components
pub const KEY_SEPARATOR: char = '\u{1f}';

const ESCAPE: char = '\\';

/// Check whether an event belongs to a collection
///
/// The event must carry the subscribed name and every listed label key.
/// Extra labels on the event are ignored.
pub fn matches(event: &Event, event_name: &str, labels: &[String]) -> bool {
    if event.name != event_name {
        return false;
    }
    if event.labels.len() < labels.len() {
        return false;
    }
    labels.iter().all(|label| event.labels.contains_key(label))
}

/// Project an event's values for the given label keys, in order
///
/// Labels absent from the event yield an empty value; callers check
/// [`matches`] first.
pub fn label_values<'a>(event: &'a Event, labels: &[String]) -> Vec<&'a str> {
    labels
        .iter()
        .map(|label| event.label(label).unwrap_or(""))
        .collect()
}

/// Build the group key for a label-value combination
///
/// `labels` and `values` are parallel and must already be in the
/// collection's declared order.
pub fn group_key<L, V>(labels: &[L], values: &[V]) -> String
where
    L: AsRef<str>,
    V: AsRef<str>,
{
    debug_assert_eq!(
        labels.len(),
        values.len(),
        "labels and values must be parallel"
    );

    let capacity = labels
        .iter()
        .zip(values)
        .map(|(l, v)| l.as_ref().len() + v.as_ref().len() + 2)
        .sum();
    let mut key = String::with_capacity(capacity);
    for (label, value) in labels.iter().zip(values) {
        key.push_str(label.as_ref());
        key.push(KEY_SEPARATOR);
        push_escaped(&mut key, value.as_ref());
        key.push(KEY_SEPARATOR);
    }
    key
}

fn push_escaped(key: &mut String, value: &str) {
    if !value.contains([ESCAPE, KEY_SEPARATOR]) {
        key.push_str(value);
        return;
    }
    for c in value.chars() {
        if c == ESCAPE || c == KEY_SEPARATOR {
            key.push(ESCAPE);
        }
        key.push(c);
    }
}
