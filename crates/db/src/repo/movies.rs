use marquee_core::types::{Movie, NewMovie, PaginationCursor};
use sqlx::SqlitePool;

/// Keyset position of a movie in the listing order (newest first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieCursor {
    pub created_ts: i64,
    pub id: String,
}

impl MovieCursor {
    pub fn encode(&self) -> PaginationCursor {
        PaginationCursor::new(hex::encode(format!("{}:{}", self.created_ts, self.id)))
    }

    /// Decode an opaque cursor. Returns `None` for anything this store did
    /// not issue.
    pub fn decode(cursor: &PaginationCursor) -> Option<Self> {
        let raw = hex::decode(cursor.as_str()).ok()?;
        let raw = String::from_utf8(raw).ok()?;
        let (ts, id) = raw.split_once(':')?;
        if id.is_empty() {
            return None;
        }
        Some(Self {
            created_ts: ts.parse().ok()?,
            id: id.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MovieRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub video_url: String,
    pub genre: String,
    pub duration: String,
    pub rating: f64,
    pub year: i64,
    pub created_by: Option<String>,
    pub created_ts: i64,
}

impl MovieRow {
    pub fn cursor(&self) -> MovieCursor {
        MovieCursor {
            created_ts: self.created_ts,
            id: self.id.clone(),
        }
    }

    pub fn into_movie(self) -> Movie {
        Movie {
            id: self.id,
            title: self.title,
            description: self.description,
            poster_url: self.poster_url,
            video_url: self.video_url,
            genre: self.genre,
            duration: self.duration,
            rating: self.rating,
            year: self.year as i32,
        }
    }
}

type MovieTuple = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    f64,
    i64,
    Option<String>,
    i64,
);

const SELECT_MOVIE: &str = "SELECT id, title, description, poster_url, video_url, genre, duration, \
     rating, year, created_by, created_ts FROM movie";

pub async fn insert_movie(
    pool: &SqlitePool,
    movie: &NewMovie,
    created_by: Option<&str>,
) -> Result<MovieRow, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO movie (id, title, description, poster_url, video_url, genre, duration, \
         rating, year, created_by, created_ts) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&movie.draft.title)
    .bind(&movie.draft.description)
    .bind(&movie.poster_url)
    .bind(&movie.video_url)
    .bind(&movie.draft.genre)
    .bind(&movie.draft.duration)
    .bind(movie.draft.rating)
    .bind(movie.draft.year as i64)
    .bind(created_by)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(MovieRow {
        id,
        title: movie.draft.title.clone(),
        description: movie.draft.description.clone(),
        poster_url: movie.poster_url.clone(),
        video_url: movie.video_url.clone(),
        genre: movie.draft.genre.clone(),
        duration: movie.draft.duration.clone(),
        rating: movie.draft.rating,
        year: movie.draft.year as i64,
        created_by: created_by.map(str::to_string),
        created_ts: now,
    })
}

pub async fn get_movie(pool: &SqlitePool, id: &str) -> Result<Option<MovieRow>, sqlx::Error> {
    let row: Option<MovieTuple> = sqlx::query_as(&format!("{SELECT_MOVIE} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(row_to_movie))
}

/// One page of movies, newest first, strictly after `after` when given.
pub async fn list_page(
    pool: &SqlitePool,
    after: Option<&MovieCursor>,
    limit: i64,
) -> Result<Vec<MovieRow>, sqlx::Error> {
    let rows: Vec<MovieTuple> = match after {
        Some(cursor) => {
            sqlx::query_as(&format!(
                "{SELECT_MOVIE} WHERE (created_ts < ?) OR (created_ts = ? AND id < ?) \
                 ORDER BY created_ts DESC, id DESC LIMIT ?"
            ))
            .bind(cursor.created_ts)
            .bind(cursor.created_ts)
            .bind(&cursor.id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(&format!(
                "{SELECT_MOVIE} ORDER BY created_ts DESC, id DESC LIMIT ?"
            ))
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows.into_iter().map(row_to_movie).collect())
}

fn row_to_movie(r: MovieTuple) -> MovieRow {
    MovieRow {
        id: r.0,
        title: r.1,
        description: r.2,
        poster_url: r.3,
        video_url: r.4,
        genre: r.5,
        duration: r.6,
        rating: r.7,
        year: r.8,
        created_by: r.9,
        created_ts: r.10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::types::MovieDraft;
    use std::collections::HashSet;

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            draft: MovieDraft {
                title: title.into(),
                description: "desc".into(),
                genre: "Drama".into(),
                duration: "1h 30m".into(),
                rating: 3.0,
                year: 2001,
            },
            poster_url: "http://localhost/blobs/p".into(),
            video_url: "http://localhost/blobs/v".into(),
        }
    }

    #[test]
    fn cursor_encoding_is_reversible_and_opaque() {
        let cursor = MovieCursor {
            created_ts: 1_700_000_000,
            id: "abc-123".into(),
        };
        let token = cursor.encode();
        assert!(!token.as_str().contains("abc"));
        assert_eq!(MovieCursor::decode(&token), Some(cursor));
    }

    #[test]
    fn foreign_cursor_is_rejected() {
        assert!(MovieCursor::decode(&PaginationCursor::new("zz")).is_none());
        assert!(MovieCursor::decode(&PaginationCursor::new(hex::encode("nope"))).is_none());
        assert!(MovieCursor::decode(&PaginationCursor::new(hex::encode("12:"))).is_none());
    }

    #[tokio::test]
    async fn keyset_pages_do_not_overlap() {
        let pool = crate::connect(":memory:").await.unwrap();
        crate::migrate::run(&pool).await.unwrap();
        for i in 0..25 {
            insert_movie(&pool, &new_movie(&format!("Movie {i}")), None)
                .await
                .unwrap();
        }

        let mut seen = HashSet::new();
        let mut after: Option<MovieCursor> = None;
        let mut sizes = Vec::new();
        loop {
            let page = list_page(&pool, after.as_ref(), 12).await.unwrap();
            sizes.push(page.len());
            for row in &page {
                assert!(seen.insert(row.id.clone()), "duplicate {}", row.id);
            }
            match page.last() {
                Some(last) => after = Some(last.cursor()),
                None => break,
            }
        }

        assert_eq!(sizes, vec![12, 12, 1, 0]);
        assert_eq!(seen.len(), 25);
    }

    #[tokio::test]
    async fn get_round_trips_fields() {
        let pool = crate::connect(":memory:").await.unwrap();
        crate::migrate::run(&pool).await.unwrap();
        let row = insert_movie(&pool, &new_movie("Night Train"), None).await.unwrap();

        let movie = get_movie(&pool, &row.id).await.unwrap().unwrap().into_movie();
        assert_eq!(movie.title, "Night Train");
        assert_eq!(movie.year, 2001);
        assert!(get_movie(&pool, "missing").await.unwrap().is_none());
    }
}
