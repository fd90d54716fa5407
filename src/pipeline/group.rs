use crate::PipelineError;
use crate::pipeline::record::{Group, Record};
use std::rc::Rc;

/// Third pipeline stage: collapses consecutive records sharing a top-level
/// kind (diff vs non-diff) into groups.
///
/// Buffers a single lookahead record to detect group boundaries. When an
/// error arrives mid-group the partial group is discarded and the error is
/// yielded instead.
pub struct Grouper<I> {
    input: I,
    pending: Option<Record>,
    failed: bool,
}

impl<I> Grouper<I> {
    pub fn new(input: I) -> Self {
        Grouper {
            input,
            pending: None,
            failed: false,
        }
    }
}

impl<I> Iterator for Grouper<I>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
{
    type Item = Result<Group, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let first = match self.pending.take() {
            Some(record) => record,
            None => match self.input.next()? {
                Ok(record) => record,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            },
        };
        let kind = first.info.group_kind();
        let mut items = vec![Rc::new(first)];
        loop {
            match self.input.next() {
                None => break,
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                Some(Ok(record)) if record.info.group_kind() == kind => {
                    items.push(Rc::new(record));
                }
                Some(Ok(record)) => {
                    self.pending = Some(record);
                    break;
                }
            }
        }
        Some(Ok(Group { kind, items }))
    }
}
