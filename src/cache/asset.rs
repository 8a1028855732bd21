
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::cache::{ResourceKey, TypeTag};


/// A Rust type that can be stored in the cache under its [`TypeTag`].
pub trait Resource: Any + Send + Sync {
    const TAG: TypeTag;
}


/// Shared, type-erased handle to a loaded resource.
#[derive(Clone)]
pub struct Asset {
    tag: TypeTag,
    data: Arc<dyn Any + Send + Sync>,
}


impl Asset {

    pub fn new<R: Resource>(resource: R) -> Self {
        Self::from_arc(Arc::new(resource))
    }

    pub fn from_arc<R: Resource>(resource: Arc<R>) -> Self {
        Self {
            tag: R::TAG,
            data: resource,
        }
    }

    #[inline]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn downcast<R: Resource>(&self) -> Option<Arc<R>> {
        if self.tag != R::TAG {
            return None;
        }
        self.data.clone().downcast::<R>().ok()
    }

    pub fn downcast_ref<R: Resource>(&self) -> Option<&R> {
        if self.tag != R::TAG {
            return None;
        }
        self.data.downcast_ref::<R>()
    }

    /// Whether both handles point at the same loaded value.
    #[inline]
    pub fn ptr_eq(a: &Asset, b: &Asset) -> bool {
        Arc::ptr_eq(&a.data, &b.data)
    }

    /// Number of live handles to this value, including `self`.
    #[inline]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("tag", &self.tag)
            .field("data", &Arc::as_ptr(&self.data))
            .finish()
    }
}



#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("resource not found: {0}")]
    NotFound(ResourceKey),

    #[error("failed to decode {key}: {reason}")]
    Decode {
        key: ResourceKey,
        reason: String,
    },

    #[error("{key} resolved to a value tagged {found}")]
    TypeMismatch {
        key: ResourceKey,
        found: TypeTag,
    },

    #[error("load was canceled before producing a value")]
    Canceled,
}


/// Outcome of a load. Failures are cached just like values.
pub type LoadResult = Result<Asset, LoadError>;


pub(crate) fn downcast_result<R: Resource>(key: &ResourceKey, result: LoadResult) -> Result<Arc<R>, LoadError> {
    let asset = result?;
    asset.downcast::<R>().ok_or_else(|| LoadError::TypeMismatch {
        key: key.clone(),
        found: asset.tag(),
    })
}



#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Sword(u32);
    impl Resource for Sword {
        const TAG: TypeTag = TypeTag::new("Prefab");
    }

    #[derive(Debug, PartialEq)]
    struct Map;
    impl Resource for Map {
        const TAG: TypeTag = TypeTag::new("Texture");
    }

    #[test]
    fn downcast_checks_tag_and_type() {
        let asset = Asset::new(Sword(3));
        assert_eq!(asset.tag(), Sword::TAG);
        assert_eq!(*asset.downcast::<Sword>().unwrap(), Sword(3));
        assert!(asset.downcast::<Map>().is_none());
        assert_eq!(asset.downcast_ref::<Sword>(), Some(&Sword(3)));
        assert!(asset.downcast_ref::<Map>().is_none());
    }

    #[test]
    fn both_downcasts_agree_on_the_tag() {
        // same Rust type stored under a different tag
        #[derive(Debug, PartialEq)]
        struct Shield;
        impl Resource for Shield {
            const TAG: TypeTag = TypeTag::new("Prefab");
        }

        let mut asset = Asset::new(Shield);
        asset.tag = Map::TAG;
        assert!(asset.downcast::<Shield>().is_none());
        assert!(asset.downcast_ref::<Shield>().is_none());
    }

    #[test]
    fn clones_share_the_value() {
        let a = Asset::new(Sword(1));
        let b = a.clone();
        assert!(Asset::ptr_eq(&a, &b));
        assert_eq!(a.handle_count(), 2);
        assert!(!Asset::ptr_eq(&a, &Asset::new(Sword(1))));
    }

    #[test]
    fn mismatched_results_report_the_found_tag() {
        let key = ResourceKey::of::<Map>("sword");
        let err = downcast_result::<Map>(&key, Ok(Asset::new(Sword(0)))).unwrap_err();
        assert_eq!(err, LoadError::TypeMismatch { key, found: Sword::TAG });
    }
}
