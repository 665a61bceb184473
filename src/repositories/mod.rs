use sqlx::PgPool;

pub mod categories_repo;
pub mod comments_repo;
pub mod memory;
pub mod posts_repo;
pub mod profiles_repo;
pub mod tags_repo;

#[derive(Clone)]
pub struct PostgresRepo {
    pool: PgPool,
}

impl PostgresRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Shared projection for post listings; callers append `WHERE`/`ORDER BY`.
pub(crate) const POST_SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.excerpt, p.cover_image, p.created_at,
           pr.name AS author_name, pr.avatar_url AS author_avatar_url,
           c.name AS category_name, c.slug AS category_slug
    FROM posts p
    LEFT JOIN profiles pr ON pr.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// Escapes `%`, `_` and `\` so user input is matched literally by `ILIKE`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_done\\"), "%100\\%\\_done\\\\%");
    }
}
