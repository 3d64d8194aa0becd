//! Referential-integrity policies between stored entities.
//!
//! Every foreign key in the data model is listed in [`RELATIONS`] together
//! with what happens to the referencing row when its parent is deleted.
//! Store adapters consult this table at deletion time; the Postgres schema
//! mirrors it with `ON DELETE` clauses.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Group,
    Post,
    Comment,
    Follow,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Post => "post",
            EntityKind::Comment => "comment",
            EntityKind::Follow => "follow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the referencing row as well.
    Cascade,
    /// Keep the referencing row and clear the reference.
    SetNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub child: EntityKind,
    pub field: &'static str,
    pub parent: EntityKind,
    pub nullable: bool,
    pub on_delete: OnDelete,
}

pub const RELATIONS: &[Relation] = &[
    Relation {
        child: EntityKind::Post,
        field: "author",
        parent: EntityKind::User,
        nullable: false,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        child: EntityKind::Post,
        field: "group",
        parent: EntityKind::Group,
        nullable: true,
        on_delete: OnDelete::SetNull,
    },
    Relation {
        child: EntityKind::Comment,
        field: "post",
        parent: EntityKind::Post,
        nullable: false,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        child: EntityKind::Comment,
        field: "author",
        parent: EntityKind::User,
        nullable: false,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        child: EntityKind::Follow,
        field: "user",
        parent: EntityKind::User,
        nullable: false,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        child: EntityKind::Follow,
        field: "author",
        parent: EntityKind::User,
        nullable: false,
        on_delete: OnDelete::Cascade,
    },
];

/// Relations whose parent side is `parent`.
pub fn relations_to(parent: EntityKind) -> impl Iterator<Item = &'static Relation> {
    RELATIONS
        .iter()
        .filter(move |relation| relation.parent == parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_null_only_on_nullable_fields() {
        for relation in RELATIONS {
            if relation.on_delete == OnDelete::SetNull {
                assert!(
                    relation.nullable,
                    "{}.{} cannot be set to null",
                    relation.child.as_str(),
                    relation.field
                );
            }
        }
    }

    #[test]
    fn deleting_a_group_never_cascades() {
        assert!(relations_to(EntityKind::Group).all(|r| r.on_delete == OnDelete::SetNull));
    }

    #[test]
    fn user_owns_posts_comments_and_both_follow_sides() {
        let mut owned: Vec<(EntityKind, &str)> = relations_to(EntityKind::User)
            .map(|r| (r.child, r.field))
            .collect();
        owned.sort_by_key(|(kind, field)| (kind.as_str(), *field));
        assert_eq!(
            owned,
            vec![
                (EntityKind::Comment, "author"),
                (EntityKind::Follow, "author"),
                (EntityKind::Follow, "user"),
                (EntityKind::Post, "author"),
            ]
        );
    }
}
