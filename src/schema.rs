use crate::types::Type;

// Ordered sequence of (type, optional name) pairs describing a tuple's
// shape. Equality is positional on types only.
#[derive(Debug, Clone)]
pub struct Schema {
    types: Vec<Type>,
    names: Vec<Option<String>>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}
impl Eq for Schema {}

impl Schema {
    pub fn new(types: Vec<Type>, names: Vec<Option<String>>) -> Self {
        assert_eq!(
            types.len(),
            names.len(),
            "a schema needs one name slot per type"
        );
        Schema { types, names }
    }

    // Convenience constructor for every field named.
    pub fn with_names(fields: Vec<(Type, &str)>) -> Self {
        let types = fields.iter().map(|(t, _)| *t).collect();
        let names = fields.iter().map(|(_, n)| Some(n.to_string())).collect();
        Schema::new(types, names)
    }

    pub fn num_fields(&self) -> usize {
        self.types.len()
    }

    pub fn field_type(&self, i: usize) -> Option<Type> {
        self.types.get(i).copied()
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.names.get(i).and_then(|n| n.as_deref())
    }

    // Total serialized size of a tuple with this schema.
    pub fn size(&self) -> usize {
        self.types.iter().map(|t| t.len()).sum()
    }

    // Merges two schemas into one, concatenating fields and names.
    pub fn concat(left: &Schema, right: &Schema) -> Schema {
        let mut types = left.types.clone();
        types.extend(right.types.clone());
        let mut names = left.names.clone();
        names.extend(right.names.clone());
        Schema::new(types, names)
    }

    pub fn types(&self) -> &[Type] {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_positional_on_types_only() {
        let a = Schema::with_names(vec![(Type::Int, "a"), (Type::Int, "b")]);
        let b = Schema::with_names(vec![(Type::Int, "x"), (Type::Int, "y")]);
        assert_eq!(a, b);
    }

    #[test]
    fn concat_merges_fields_and_names() {
        let a = Schema::with_names(vec![(Type::Int, "a")]);
        let b = Schema::with_names(vec![(Type::String(8), "b")]);
        let c = Schema::concat(&a, &b);
        assert_eq!(c.num_fields(), 2);
        assert_eq!(c.field_name(0), Some("a"));
        assert_eq!(c.field_name(1), Some("b"));
        assert_eq!(c.size(), 4 + 12);
    }

    #[test]
    fn size_sums_field_sizes() {
        let schema = Schema::with_names(vec![(Type::Int, "a"), (Type::Int, "b")]);
        assert_eq!(schema.size(), 8);
    }
}
