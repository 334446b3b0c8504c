//! Ambient, thread-scoped properties.
//!
//! ```rust,ignore
//! let _guard = LogContext::push_property("RequestId", 42);
//! logger.information("handled", args![]); // carries RequestId = 42
//! // guard dropped: RequestId no longer attached
//! ```

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::value::Value;

thread_local! {
    static STACK: RefCell<Vec<(String, Value)>> = const { RefCell::new(Vec::new()) };
}

/// Entry point for pushing ambient properties onto the current thread.
pub struct LogContext;

impl LogContext {
    /// Push a property for the lifetime of the returned guard.
    #[must_use = "the property is removed when the guard is dropped"]
    pub fn push_property(name: impl Into<String>, value: impl Into<Value>) -> LogContextGuard {
        let entry = (name.into(), value.into());
        let depth = STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let depth = stack.len();
            stack.push(entry);
            depth
        });
        LogContextGuard {
            depth,
            _not_send: PhantomData,
        }
    }

    /// Snapshot of the current thread's properties, outermost first.
    pub fn current() -> Vec<(String, Value)> {
        STACK.with(|stack| stack.borrow().clone())
    }

    pub(crate) fn for_each(mut f: impl FnMut(&str, &Value)) {
        STACK.with(|stack| {
            for (name, value) in stack.borrow().iter() {
                f(name, value);
            }
        })
    }
}

/// Pops its property (and anything pushed after it) when dropped.
///
/// Not `Send`: the property lives on the thread that pushed it.
pub struct LogContextGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for LogContextGuard {
    fn drop(&mut self) {
        let depth = self.depth;
        STACK.with(|stack| stack.borrow_mut().truncate(depth));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_nest_and_pop() {
        {
            let _outer = LogContext::push_property("A", 1);
            {
                let _inner = LogContext::push_property("B", 2);
                assert_eq!(LogContext::current().len(), 2);
            }
            let names: Vec<String> = LogContext::current().into_iter().map(|(n, _)| n).collect();
            assert_eq!(names, vec!["A"]);
        }
        assert!(LogContext::current().is_empty());
    }

    #[test]
    fn test_context_is_thread_local() {
        let _guard = LogContext::push_property("Here", true);
        let seen = std::thread::spawn(|| LogContext::current().len())
            .join()
            .unwrap();
        assert_eq!(seen, 0);
        assert_eq!(LogContext::current().len(), 1);
    }
}
