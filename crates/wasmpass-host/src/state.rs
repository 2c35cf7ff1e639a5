//! Per-instance host state stored in the wasmi `Store`.

use wasmpass_types::HandleTable;

use crate::allocator::Allocator;

/// Host-side data reachable from every import through `Caller::data`.
///
/// `T` is the type of host object the guest refers to by handle.  Use
/// `Box<dyn Any + Send>` for a table of mixed objects.
#[derive(Debug)]
pub struct HostState<T> {
    handles: HandleTable<T>,
    guest_log: Vec<String>,
    guest_log_limit: usize,
    dropped_log: u64,
    memory_export: String,
    allocator: Option<Allocator>,
}

impl<T> HostState<T> {
    pub(crate) fn new(memory_export: String, guest_log_limit: usize) -> Self {
        Self {
            handles: HandleTable::new(),
            guest_log: Vec::new(),
            guest_log_limit,
            dropped_log: 0,
            memory_export,
            allocator: None,
        }
    }

    pub fn handles(&self) -> &HandleTable<T> {
        &self.handles
    }

    pub fn handles_mut(&mut self) -> &mut HandleTable<T> {
        &mut self.handles
    }

    /// Messages the guest sent through `logThis`, oldest first.
    pub fn guest_log(&self) -> &[String] {
        &self.guest_log
    }

    pub fn take_guest_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.guest_log)
    }

    /// Messages discarded because the log was full.
    pub fn dropped_guest_log(&self) -> u64 {
        self.dropped_log
    }

    /// Retain `message` unless the log is full.  Returns whether it was kept.
    pub(crate) fn push_log(&mut self, message: String) -> bool {
        if self.guest_log.len() >= self.guest_log_limit {
            self.dropped_log += 1;
            return false;
        }
        self.guest_log.push(message);
        true
    }

    /// Name of the guest's exported memory.
    pub fn memory_export(&self) -> &str {
        &self.memory_export
    }

    /// The guest allocator; `None` until instantiation has completed, i.e.
    /// during the module's start function.
    pub fn allocator(&self) -> Option<&Allocator> {
        self.allocator.as_ref()
    }

    pub(crate) fn set_allocator(&mut self, allocator: Allocator) {
        self.allocator = Some(allocator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_log_is_bounded() {
        let mut state = HostState::<()>::new("memory".to_string(), 2);
        assert!(state.push_log("a".to_string()));
        assert!(state.push_log("b".to_string()));
        assert!(!state.push_log("c".to_string()));
        assert_eq!(state.guest_log(), ["a".to_string(), "b".to_string()]);
        assert_eq!(state.dropped_guest_log(), 1);

        assert_eq!(state.take_guest_log().len(), 2);
        assert!(state.push_log("d".to_string()));
        assert_eq!(state.guest_log(), ["d".to_string()]);
    }
}
