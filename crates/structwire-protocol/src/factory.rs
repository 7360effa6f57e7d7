use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::protocol::Protocol;

/// A type that knows how to build one struct schema.
pub trait ProtocolFactory: 'static {
    fn build() -> Result<Protocol>;
}

/// Lazily built, shared protocol instances: one per factory type.
///
/// The cache is an ordinary value owned by whoever needs it (usually a
/// receiver), so instance lifetimes follow that owner.
#[derive(Debug, Default)]
pub struct Singletons {
    instances: HashMap<TypeId, Arc<Protocol>>,
}

impl Singletons {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance for `F`, built on first use and reused afterwards.
    pub fn singleton<F: ProtocolFactory>(&mut self) -> Result<Arc<Protocol>> {
        let key = TypeId::of::<F>();
        if let Some(existing) = self.instances.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let protocol = Arc::new(F::build()?);
        debug!(name = protocol.name(), id = protocol.id(), "built protocol singleton");
        self.instances.insert(key, Arc::clone(&protocol));
        Ok(protocol)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use structwire_primitives::PrimitiveKind;

    use super::*;
    use crate::field::FieldSpec;

    static BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Heartbeat;

    impl ProtocolFactory for Heartbeat {
        fn build() -> Result<Protocol> {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            let mut protocol = Protocol::new("heartbeat", 5);
            protocol.add_field(FieldSpec::new("uptime", PrimitiveKind::U32))?;
            Ok(protocol)
        }
    }

    #[test]
    fn singleton_is_built_once_and_shared() {
        let mut singletons = Singletons::new();
        let first = singletons.singleton::<Heartbeat>().unwrap();
        let second = singletons.singleton::<Heartbeat>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
        assert_eq!(singletons.len(), 1);

        first.set_value("uptime", 10u32).unwrap();
        assert_eq!(second.value("uptime").unwrap().as_u64(), Some(10));
    }
}
