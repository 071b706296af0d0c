use crate::error::Result;
use crate::tuple::Tuple;
use std::iter::FusedIterator;

/// Lazy iteration over fetched tuples.
///
/// Calls `fetch` whenever the current batch is exhausted and stops at the
/// first empty batch, so one iteration is finite. After an error has been
/// yielded the iterator is exhausted; tuples yielded before it stay valid.
pub struct Each<F> {
    fetch: F,
    pending: std::vec::IntoIter<Tuple>,
    done: bool,
}

impl<F> Each<F>
where
    F: FnMut() -> Result<Vec<Tuple>>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            pending: Vec::new().into_iter(),
            done: false,
        }
    }
}

impl<F> Iterator for Each<F>
where
    F: FnMut() -> Result<Vec<Tuple>>,
{
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.pending.next() {
                return Some(Ok(tuple));
            }
            if self.done {
                return None;
            }
            match (self.fetch)() {
                Ok(batch) if batch.is_empty() => {
                    self.done = true;
                    return None;
                }
                Ok(batch) => self.pending = batch.into_iter(),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<F> FusedIterator for Each<F> where F: FnMut() -> Result<Vec<Tuple>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn batches(mut batches: Vec<Result<Vec<Tuple>>>) -> impl FnMut() -> Result<Vec<Tuple>> {
        batches.reverse();
        move || batches.pop().unwrap_or_else(|| Ok(Vec::new()))
    }

    #[test]
    fn test_stops_at_first_empty_batch() {
        let mut calls = 0;
        let mut source = batches(vec![
            Ok(vec![Tuple::new("a"), Tuple::new("b")]),
            Ok(vec![Tuple::new("c")]),
            Ok(vec![]),
            Ok(vec![Tuple::new("unreached")]),
        ]);
        let values: Vec<String> = Each::new(|| {
            calls += 1;
            source()
        })
        .map(|tuple| tuple.unwrap().value)
        .collect();

        assert_eq!(values, vec!["a", "b", "c"]);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_error_ends_iteration() {
        let mut each = Each::new(batches(vec![
            Ok(vec![Tuple::new("a")]),
            Err(Error::Transport("leader not available".to_string())),
            Ok(vec![Tuple::new("b")]),
        ]));

        assert_eq!(each.next().unwrap().unwrap().value, "a");
        assert!(each.next().unwrap().unwrap_err().is_transport());
        assert!(each.next().is_none());
        assert!(each.next().is_none());
    }

    #[test]
    fn test_take_does_not_fetch_past_the_limit() {
        let mut calls = 0;
        let mut source = batches(vec![
            Ok(vec![Tuple::new("a"), Tuple::new("b"), Tuple::new("c")]),
            Ok(vec![Tuple::new("d")]),
        ]);
        let taken: Vec<_> = Each::new(|| {
            calls += 1;
            source()
        })
        .take(2)
        .collect();

        assert_eq!(taken.len(), 2);
        assert_eq!(calls, 1);
    }
}
