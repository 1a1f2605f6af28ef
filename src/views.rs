use crate::catalog::filter_by_title;
use crate::models::{CastMember, MovieDetail, MovieSummary};
use crate::tmdb::{image_url, POSTER_SIZE, PROFILE_SIZE};
use std::collections::HashSet;

pub const PLACEHOLDER_POSTER: &str = "/static/placeholder-poster.svg";
pub const PLACEHOLDER_PROFILE: &str = "/static/placeholder-profile.svg";

pub const PLACEHOLDER_POSTER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="500" height="750" viewBox="0 0 500 750"><rect width="500" height="750" fill="#d1d5db"/><text x="250" y="375" font-family="sans-serif" font-size="40" text-anchor="middle" fill="#6b7280">No image</text></svg>"##;
pub const PLACEHOLDER_PROFILE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200"><rect width="200" height="200" fill="#e5e7eb"/><circle cx="100" cy="80" r="40" fill="#9ca3af"/><rect x="40" y="130" width="120" height="60" rx="30" fill="#9ca3af"/></svg>"##;

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; background: #f9fafb; }
.container { max-width: 1100px; margin: 0 auto; padding: 16px; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 16px; }
.card { border: 1px solid #e5e7eb; border-radius: 6px; background: #fff; overflow: hidden; color: inherit; text-decoration: none; display: block; }
.card img { width: 100%; display: block; }
.card .body { padding: 8px; }
.fav { margin-top: 8px; padding: 8px 16px; border: 0; border-radius: 4px; cursor: pointer; background: #e5e7eb; }
.fav.on { background: #ef4444; color: #fff; }
.search { width: 100%; padding: 8px; margin-bottom: 16px; box-sizing: border-box; }
.cast { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 16px; }
.cast img { width: 64px; height: 64px; border-radius: 50%; object-fit: cover; }
.member { display: flex; align-items: center; gap: 12px; }
nav a { margin-right: 16px; }
"#;

const SCRIPT: &str = r#"
function favLabel(on) { return on ? 'Remove from Favorites' : 'Add to Favorites'; }
function paint(btn, on) { btn.classList.toggle('on', on); btn.textContent = favLabel(on); }
document.addEventListener('click', async (e) => {
  const btn = e.target.closest('button.fav');
  if (!btn) return;
  e.preventDefault();
  e.stopPropagation();
  const res = await fetch('/api/favorites/toggle', {
    method: 'POST', headers: { 'content-type': 'application/json' }, body: btn.dataset.movie
  });
  if (res.ok) { const body = await res.json(); paint(btn, body.favorite); }
});
const search = document.querySelector('input.search');
if (search) {
  const apply = () => {
    const q = search.value.toLowerCase();
    document.querySelectorAll('.card[data-title]').forEach((card) => {
      card.style.display = card.dataset.title.toLowerCase().includes(q) ? '' : 'none';
    });
  };
  search.addEventListener('input', apply);
  apply();
}
const events = new EventSource('/api/favorites/events');
events.addEventListener('storage', async (e) => {
  const change = JSON.parse(e.data);
  if (change.key !== 'favorites') return;
  if (document.body.dataset.view === 'favorites') { location.reload(); return; }
  const ids = new Set(JSON.parse(change.new_value || '[]').map((m) => m.id));
  document.querySelectorAll('button.fav').forEach((btn) => paint(btn, ids.has(Number(btn.dataset.id))));
});
"#;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(view: &str, title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n\
         <body data-view=\"{view}\">\n<div class=\"container\">\n\
         <nav><a href=\"/\">Popular</a><a href=\"/favorites\">Favorites</a></nav>\n\
         {body}\n</div>\n<script>{SCRIPT}</script>\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn poster_src(image_base: &str, movie: &MovieSummary) -> String {
    image_url(image_base, POSTER_SIZE, movie.poster_path.as_deref())
        .unwrap_or_else(|| PLACEHOLDER_POSTER.to_string())
}

fn profile_src(image_base: &str, member: &CastMember) -> String {
    image_url(image_base, PROFILE_SIZE, member.profile_path.as_deref())
        .unwrap_or_else(|| PLACEHOLDER_PROFILE.to_string())
}

fn favorite_button(movie: &MovieSummary, is_favorite: bool) -> String {
    let payload = serde_json::to_string(movie).unwrap_or_default();
    format!(
        "<button class=\"fav{on}\" data-id=\"{id}\" data-movie=\"{payload}\">{label}</button>",
        on = if is_favorite { " on" } else { "" },
        id = movie.id,
        payload = escape_html(&payload),
        label = if is_favorite {
            "Remove from Favorites"
        } else {
            "Add to Favorites"
        },
    )
}

pub fn movie_card(movie: &MovieSummary, is_favorite: bool, image_base: &str) -> String {
    card(movie, is_favorite, image_base, true)
}

fn card(movie: &MovieSummary, is_favorite: bool, image_base: &str, shown: bool) -> String {
    format!(
        "<a class=\"card\" href=\"/movie/{id}\" data-title=\"{title}\"{hidden}>\
         <img src=\"{src}\" alt=\"{title}\">\
         <div class=\"body\"><h3>{title}</h3>\
         <p>Release Date: {date}</p><p>Rating: {rating}</p>{button}</div></a>",
        id = movie.id,
        hidden = if shown { "" } else { " style=\"display:none\"" },
        title = escape_html(&movie.title),
        src = escape_html(&poster_src(image_base, movie)),
        date = escape_html(&movie.release_date),
        rating = movie.vote_average,
        button = favorite_button(movie, is_favorite),
    )
}

/// Catalog list. Every fetched movie gets a card so the in-page filter can
/// bring any of them back; cards not matching `query` start hidden.
pub fn render_catalog<F>(
    movies: &[MovieSummary],
    query: &str,
    is_favorite: F,
    image_base: &str,
) -> String
where
    F: Fn(i64) -> bool,
{
    let matching: HashSet<i64> = filter_by_title(movies, query)
        .into_iter()
        .map(|m| m.id)
        .collect();
    let cards: String = movies
        .iter()
        .map(|m| card(m, is_favorite(m.id), image_base, matching.contains(&m.id)))
        .collect();
    let body = format!(
        "<input class=\"search\" type=\"text\" placeholder=\"Search Movies\" value=\"{query}\">\n\
         <div class=\"grid\">{cards}</div>",
        query = escape_html(query),
    );
    layout("catalog", "Popular Movies", &body)
}

pub fn render_favorites(favorites: &[MovieSummary], image_base: &str) -> String {
    let content = if favorites.is_empty() {
        "<div class=\"empty\"><p>No favorite movies yet!</p>\
         <p>Start adding movies to your favorites to see them here.</p>\
         <a href=\"/\">Browse Movies</a></div>"
            .to_string()
    } else {
        let cards: String = favorites
            .iter()
            .map(|m| movie_card(m, true, image_base))
            .collect();
        format!("<div class=\"grid\">{cards}</div>")
    };
    let body = format!(
        "<h1>My Favorite Movies</h1><a href=\"/\">Return to Home</a>\n{content}"
    );
    layout("favorites", "My Favorite Movies", &body)
}

pub fn render_detail(detail: &MovieDetail, is_favorite: bool, image_base: &str) -> String {
    let movie = &detail.summary;
    let genres: String = detail
        .genres
        .iter()
        .map(|g| format!("<li>{}</li>", escape_html(&g.name)))
        .collect();
    let cast: String = detail
        .cast
        .iter()
        .map(|c| {
            format!(
                "<div class=\"member\"><img src=\"{src}\" alt=\"{name}\">\
                 <div><p><strong>{name}</strong></p><p>as {character}</p></div></div>",
                src = escape_html(&profile_src(image_base, c)),
                name = escape_html(&c.name),
                character = escape_html(&c.character),
            )
        })
        .collect();
    let body = format!(
        "<h1>{title}</h1>\n<img src=\"{src}\" alt=\"{title}\" width=\"300\">\n\
         <p><strong>Release Date:</strong> {date}</p>\n\
         <p><strong>Rating:</strong> {rating}</p>\n\
         <p><strong>Overview:</strong> {overview}</p>\n{button}\n\
         <h2>Genres</h2><ul>{genres}</ul>\n<h2>Cast</h2><div class=\"cast\">{cast}</div>\n\
         <p><a href=\"javascript:history.back()\">Go Back</a></p>",
        title = escape_html(&movie.title),
        src = escape_html(&poster_src(image_base, movie)),
        date = escape_html(&movie.release_date),
        rating = movie.vote_average,
        overview = escape_html(&detail.overview),
        button = favorite_button(movie, is_favorite),
    );
    layout("detail", &movie.title, &body)
}

pub fn render_not_found() -> String {
    layout("detail", "Movie not found", "<p>Movie not found!</p>")
}
