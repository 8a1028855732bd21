
use std::fmt;

use crate::cache::Resource;


/// Separator used when a key is rendered as a single identifier.
pub const SEPARATOR: char = '_';


#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(&'static str);


impl TypeTag {

    /// Panics (at compile time when used in a const) if `name` is empty or
    /// contains [`SEPARATOR`].
    pub const fn new(name: &'static str) -> Self {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            panic!("type tag names must not be empty");
        }

        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == SEPARATOR as u8 {
                panic!("type tag names must not contain the key separator");
            }
            i += 1;
        }

        TypeTag(name)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.0
    }

}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}



/// Identity of a cacheable resource.
///
/// Two requests resolve to the same cache entry iff both the path and the tag
/// are equal; the same path under another tag is a different resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    path: String,
    tag: TypeTag,
}


impl ResourceKey {

    pub fn new(path: impl Into<String>, tag: TypeTag) -> Self {
        Self {
            path: path.into(),
            tag,
        }
    }

    pub fn of<R: Resource>(path: impl Into<String>) -> Self {
        Self::new(path, R::TAG)
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.path, SEPARATOR, self.tag)
    }
}



#[cfg(test)]
mod tests {
    use super::*;

    const PREFAB: TypeTag = TypeTag::new("Prefab");
    const TEXTURE: TypeTag = TypeTag::new("Texture");

    #[test]
    fn flat_identifier_joins_path_and_tag() {
        let key = ResourceKey::new("ui/sword", PREFAB);
        assert_eq!(key.to_string(), "ui/sword_Prefab");
    }

    #[test]
    fn same_path_different_tag_is_a_different_key() {
        let a = ResourceKey::new("map", PREFAB);
        let b = ResourceKey::new("map", TEXTURE);
        assert_ne!(a, b);
        assert_eq!(a, ResourceKey::new(String::from("map"), PREFAB));
    }

    #[test]
    fn paths_containing_the_separator_stay_distinct() {
        // "a_b" + Prefab and "a" + "b_Prefab" would collide as flat strings,
        // but the second tag can't be constructed in the first place.
        let key = ResourceKey::new("a_b", PREFAB);
        assert_eq!(key.path(), "a_b");
        assert_eq!(key.tag(), PREFAB);
    }

    #[test]
    #[should_panic(expected = "separator")]
    fn tag_names_reject_the_separator() {
        let name = String::from("Bad_Tag");
        TypeTag::new(Box::leak(name.into_boxed_str()));
    }

    #[test]
    #[should_panic(expected = "empty")]
    fn tag_names_reject_empty() {
        TypeTag::new(Box::leak(String::new().into_boxed_str()));
    }
}
