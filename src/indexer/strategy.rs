use crate::context::Context;
use crate::data::{OutId, TermInDoc};
use crate::error::Result;

/// A document after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    pub out_id: OutId,
    pub terms: Vec<TermInDoc>,
    /// Fixed-size value; padded or truncated to the configured size on write.
    pub value: Vec<u8>,
    pub data: Vec<u8>,
}

/// Turns raw documents into terms, value and data.
///
/// `init` runs once before the strategy is shared; `parse_doc` is then called
/// from several threads at once.
pub trait IndexStrategy: Send + Sync {
    fn init(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    fn parse_doc(&self, doc: &[u8]) -> Result<ParsedDoc>;
}
