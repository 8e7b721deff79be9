use crate::event::{Call, Event, Sequence};
use crate::linear::LinearEvent;
use proptest::prelude::*;

fn name(index: u8) -> String {
    char::from(b'A' + index).to_string()
}

/// Events over a four-symbol alphabet, nested at most three levels deep.
pub(crate) fn arb_event() -> impl Strategy<Value = Event> {
    let leaf = (0u8..4, any::<bool>())
        .prop_map(|(index, optional)| Event::Call(Call::new(name(index)).with_optional(optional)));
    leaf.prop_recursive(3, 24, 4, |inner| {
        (prop::collection::vec(inner, 0..4), any::<bool>()).prop_map(|(events, optional)| {
            let mut group = Sequence::from_events(events);
            group.set_optional(optional);
            Event::group(group)
        })
    })
}

pub(crate) fn arb_root() -> impl Strategy<Value = Sequence> {
    prop::collection::vec(arb_event(), 0..6).prop_map(Sequence::root_from_events)
}

/// Well-formed linear sequences, wrapped in one outer group.
pub(crate) fn arb_linear() -> impl Strategy<Value = Vec<LinearEvent>> {
    arb_root().prop_map(|root| root.linearize())
}

/// Flat traces over a small alphabet.
pub(crate) fn arb_trace(alphabet: u8, max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(0..alphabet, 0..=max_len)
        .prop_map(|symbols| symbols.into_iter().map(|s| char::from(b'A' + s)).collect())
}

/// Decodes arbitrary bytes into a well-formed linear sequence.
pub(crate) fn linear_from_bytes(bytes: &[u8]) -> Vec<LinearEvent> {
    let mut tokens = Vec::with_capacity(bytes.len() + 2);
    let mut depth = 0usize;
    for &byte in bytes {
        match byte % 6 {
            0 => {
                tokens.push(LinearEvent::Begin { optional: byte & 0x80 != 0 });
                depth += 1;
            }
            1 if depth > 0 => {
                tokens.push(LinearEvent::End { optional: false });
                depth -= 1;
            }
            symbol => {
                let call = Call::new(name(symbol % 4)).with_optional(byte & 0x40 != 0);
                tokens.push(LinearEvent::Call(call));
            }
        }
    }
    tokens.extend(std::iter::repeat(LinearEvent::End { optional: false }).take(depth));
    tokens
}
