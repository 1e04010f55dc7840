//! Frame splitting: one datagram payload into its back-to-back messages.

use crate::protocol::codec::DecodeState;
use crate::protocol::message::Message;
use crate::protocol::op::Op;

/// One message cut out of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitMessage<'a> {
    pub op: Op,
    /// Raw bytes, opcode included.
    pub raw: &'a [u8],
    /// Decoded form, when decoding succeeded.
    pub message: Option<Message>,
}

/// Result of splitting a frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    /// Messages in wire order. Their raw bytes concatenate to the payload.
    pub messages: Vec<SplitMessage<'a>>,
    /// False when the last entry is an unparsed remainder rather than a message.
    pub fully_split: bool,
}

impl<'a> Split<'a> {
    /// The trailing unparsed blob, if splitting stopped early.
    pub fn remainder(&self) -> Option<&SplitMessage<'a>> {
        if self.fully_split {
            None
        } else {
            self.messages.last()
        }
    }
}

/// Split a frame payload (header already stripped) into messages.
///
/// Fixed-length opcodes are cut by their declared length; variable ones are
/// cut by what a full decode consumes. When neither works, the rest of the
/// payload becomes one unparsed entry and `fully_split` is false. A lone
/// opcode byte whose decode fails is kept as a bare message.
pub fn split<'a>(payload: &'a [u8], state: &DecodeState) -> Split<'a> {
    let mut messages = Vec::new();

    if payload.len() == 1 {
        let message = state.decode_next(payload).ok().map(|(m, _)| m);
        messages.push(SplitMessage {
            op: Op(payload[0]),
            raw: payload,
            message,
        });
        return Split {
            messages,
            fully_split: true,
        };
    }

    let mut rest = payload;
    while let Some(&first) = rest.first() {
        let op = Op(first);
        let cut = match op.payload_len() {
            Some(n) if n < rest.len() => {
                let size = n + 1;
                Some((size, state.decode_next(&rest[..size]).ok().map(|(m, _)| m)))
            }
            Some(_) => None,
            None => match state.decode_next(rest) {
                Ok((m, n)) if n > 0 => Some((n, Some(m))),
                _ => None,
            },
        };

        let Some((size, message)) = cut else {
            messages.push(SplitMessage {
                op,
                raw: rest,
                message: None,
            });
            return Split {
                messages,
                fully_split: false,
            };
        };

        let (raw, tail) = rest.split_at(size);
        messages.push(SplitMessage { op, raw, message });
        rest = tail;
    }

    Split {
        messages,
        fully_split: true,
    }
}
