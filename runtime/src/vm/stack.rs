use crate::error::VeilError;
use crate::heap::context_area::ContextSet;
use crate::keys::{ClassId, ContextId, ObjectRef};
use crate::throw_error;

/// One dispatched call of a function.
#[derive(Debug, Clone)]
pub struct ActiveCall {
    pub function: ObjectRef,
    /// Empty for functions that were never wrapped.
    pub contexts: ContextSet,
    /// Set while a constructor of `ClassId` runs against the instance.
    pub constructing: Option<(ClassId, ObjectRef)>,
}

/// Active-call registry. Strictly nested: the innermost call is the only one
/// whose contexts count as the caller's.
#[derive(Debug)]
pub struct CallStack {
    frames: Vec<ActiveCall>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub fn push(&mut self, call: ActiveCall) -> Result<(), VeilError> {
        if self.frames.len() >= self.max_depth {
            return throw_error!(StackOverflow, self.max_depth);
        }
        self.frames.push(call);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<ActiveCall> {
        self.frames.pop()
    }

    pub fn innermost(&self) -> Option<&ActiveCall> {
        self.frames.last()
    }

    /// Contexts of the innermost call. Outside any call this is empty.
    pub fn caller_contexts(&self) -> &[ContextId] {
        self.innermost()
            .map(|call| call.contexts.as_slice())
            .unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn call(function: usize, contexts: &[usize]) -> ActiveCall {
        ActiveCall {
            function: ObjectRef::from_usize(function),
            contexts: contexts.iter().copied().map(ContextId::from_usize).collect(),
            constructing: None,
        }
    }

    #[test]
    fn only_the_innermost_call_counts() {
        let mut stack = CallStack::new(8);
        assert!(stack.caller_contexts().is_empty());
        stack.push(call(1, &[1])).unwrap();
        stack.push(call(2, &[])).unwrap();
        assert!(stack.caller_contexts().is_empty());
        stack.pop();
        let expected: ContextSet = smallvec![ContextId::from_usize(1)];
        assert_eq!(stack.caller_contexts(), expected.as_slice());
    }

    #[test]
    fn overflow_is_reported() {
        let mut stack = CallStack::new(1);
        stack.push(call(1, &[])).unwrap();
        assert_eq!(stack.push(call(1, &[])), Err(VeilError::StackOverflow(1)));
        assert_eq!(stack.depth(), 1);
    }
}
