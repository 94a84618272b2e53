//! HTML pages. Every value that came from a visitor goes through [`escape`].

use actix_web::{
    HttpResponse,
    http::StatusCode,
    http::header::{ContentType, LOCATION},
};

use campgrounds::{Campground, Review};

use crate::context::RequestContext;

/// Escapes text for use in HTML content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A 200 response carrying `page`.
pub fn html(page: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page)
}

/// A `302 Found` redirect to `location`.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location))
        .finish()
}

fn navbar(ctx: &RequestContext) -> String {
    let account = match &ctx.current_user {
        Some(user) => format!(
            r#"<span class="navbar-text me-3">Signed in as {}</span>
            <a class="nav-link" href="/logout">Logout</a>"#,
            escape(&user.username)
        ),
        None => r#"<a class="nav-link" href="/login">Login</a>
            <a class="nav-link" href="/register">Register</a>"#
            .to_string(),
    };

    format!(
        r#"<nav class="navbar navbar-expand-lg navbar-dark bg-dark sticky-top">
  <div class="container-fluid">
    <a class="navbar-brand" href="/">YelpCamp</a>
    <div class="navbar-nav">
      <a class="nav-link" href="/">Home</a>
      <a class="nav-link" href="/campgrounds">Campgrounds</a>
      <a class="nav-link" href="/campgrounds/new">New Campground</a>
    </div>
    <div class="navbar-nav ms-auto">
      {account}
    </div>
  </div>
</nav>"#
    )
}

fn flash_banners(ctx: &RequestContext) -> String {
    let banner = |class: &str, message: &String| {
        format!(
            r#"<div class="alert alert-{class} alert-dismissible fade show" role="alert">{}<button type="button" class="btn-close" data-bs-dismiss="alert" aria-label="Close"></button></div>"#,
            escape(message)
        )
    };

    ctx.success
        .iter()
        .map(|message| banner("success", message))
        .chain(ctx.error.iter().map(|message| banner("danger", message)))
        .collect()
}

/// Wraps `body` in the shared page layout.
pub fn layout(ctx: &RequestContext, title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title} | YelpCamp</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css">
  <link rel="stylesheet" href="/public/stylesheets/app.css">
</head>
<body class="d-flex flex-column vh-100">
{navbar}
<main class="container mt-5">
{banners}
{body}
</main>
<footer class="footer bg-dark py-3 mt-auto">
  <div class="container"><span class="text-muted">&copy; YelpCamp</span></div>
</footer>
<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js"></script>
</body>
</html>"#,
        title = escape(title),
        navbar = navbar(ctx),
        banners = flash_banners(ctx),
    )
}

/// Landing page.
pub fn home(ctx: &RequestContext) -> String {
    layout(
        ctx,
        "Home",
        r#"<div class="text-center">
  <h1>YelpCamp</h1>
  <p class="lead">Welcome to YelpCamp! Jump right in and explore our many campgrounds.</p>
  <a href="/campgrounds" class="btn btn-lg btn-secondary">View Campgrounds</a>
</div>"#,
    )
}

fn campground_card(campground: &Campground) -> String {
    format!(
        r#"<div class="card mb-3">
  <div class="row g-0">
    <div class="col-md-4">{image}</div>
    <div class="col-md-8">
      <div class="card-body">
        <h5 class="card-title">{title}</h5>
        <p class="card-text">{description}</p>
        <p class="card-text"><small class="text-muted">{location}</small></p>
        <a class="btn btn-primary" href="/campgrounds/{id}">View {title}</a>
      </div>
    </div>
  </div>
</div>"#,
        image = image_tag(campground),
        title = escape(&campground.title),
        description = escape(&campground.description),
        location = escape(&campground.location),
        id = campground.id,
    )
}

fn image_tag(campground: &Campground) -> String {
    if campground.image.is_empty() {
        return String::new();
    }
    format!(
        r#"<img class="img-fluid" alt="" src="{}">"#,
        escape(&campground.image)
    )
}

/// All campgrounds.
pub fn campground_index(ctx: &RequestContext, campgrounds: &[Campground]) -> String {
    let cards: String = campgrounds.iter().map(campground_card).collect();
    let body = format!(
        r#"<h1>All Campgrounds</h1>
<div><a href="/campgrounds/new">Add Campground</a></div>
{cards}"#
    );
    layout(ctx, "All Campgrounds", &body)
}

fn campground_fields(campground: Option<&Campground>) -> String {
    let value = |pick: fn(&Campground) -> String| campground.map(pick).unwrap_or_default();

    format!(
        r#"<div class="mb-3">
    <label class="form-label" for="title">Title</label>
    <input class="form-control" type="text" id="title" name="title" value="{title}" required>
  </div>
  <div class="mb-3">
    <label class="form-label" for="location">Location</label>
    <input class="form-control" type="text" id="location" name="location" value="{location}" required>
  </div>
  <div class="mb-3">
    <label class="form-label" for="price">Campground Price</label>
    <input class="form-control" type="number" step="0.01" min="0" id="price" name="price" value="{price}" required>
  </div>
  <div class="mb-3">
    <label class="form-label" for="image">Image URL</label>
    <input class="form-control" type="url" id="image" name="image" value="{image}">
  </div>
  <div class="mb-3">
    <label class="form-label" for="description">Description</label>
    <textarea class="form-control" id="description" name="description" required>{description}</textarea>
  </div>"#,
        title = value(|c| escape(&c.title)),
        location = value(|c| escape(&c.location)),
        price = value(|c| c.price.to_string()),
        image = value(|c| escape(&c.image)),
        description = value(|c| escape(&c.description)),
    )
}

/// Form for a new campground.
pub fn campground_new(ctx: &RequestContext) -> String {
    let body = format!(
        r#"<h1 class="text-center">New Campground</h1>
<form action="/campgrounds" method="POST">
  {fields}
  <button class="btn btn-success">Add Campground</button>
</form>
<a href="/campgrounds">All Campgrounds</a>"#,
        fields = campground_fields(None),
    );
    layout(ctx, "New Campground", &body)
}

/// Form for editing `campground`.
pub fn campground_edit(ctx: &RequestContext, campground: &Campground) -> String {
    let body = format!(
        r#"<h1 class="text-center">Edit Campground</h1>
<form action="/campgrounds/{id}" method="POST">
  {fields}
  <button class="btn btn-info">Update Campground</button>
</form>
<a href="/campgrounds/{id}">Back To Campground</a>"#,
        id = campground.id,
        fields = campground_fields(Some(campground)),
    );
    layout(ctx, "Edit Campground", &body)
}

fn review_card(ctx: &RequestContext, review: &Review) -> String {
    let is_author = ctx
        .current_user
        .as_ref()
        .is_some_and(|user| user.id == review.author_id);
    let delete = if is_author {
        format!(
            r#"<form action="/campgrounds/{}/reviews/{}/delete" method="POST"><button class="btn btn-sm btn-danger">Delete</button></form>"#,
            review.campground_id, review.id
        )
    } else {
        String::new()
    };

    format!(
        r#"<div class="card mb-3">
  <div class="card-body">
    <h5 class="card-title">Rating: {rating}/5</h5>
    <h6 class="card-subtitle mb-2 text-muted">By {author}</h6>
    <p class="card-text">Review: {body}</p>
    {delete}
  </div>
</div>"#,
        rating = review.rating,
        author = escape(&review.author_username),
        body = escape(&review.body),
    )
}

/// A campground with its reviews.
pub fn campground_show(
    ctx: &RequestContext,
    campground: &Campground,
    reviews: &[Review],
) -> String {
    let is_author = ctx
        .current_user
        .as_ref()
        .is_some_and(|user| user.id == campground.author_id);

    let owner_actions = if is_author {
        format!(
            r#"<div class="card-body">
      <a class="card-link btn btn-info" href="/campgrounds/{id}/edit">Edit</a>
      <form class="d-inline" action="/campgrounds/{id}/delete" method="POST">
        <button class="btn btn-danger">Delete</button>
      </form>
    </div>"#,
            id = campground.id
        )
    } else {
        String::new()
    };

    let review_form = if ctx.current_user.is_some() {
        format!(
            r#"<h2>Leave a Review</h2>
<form action="/campgrounds/{id}/reviews" method="POST" class="mb-3">
  <div class="mb-3">
    <label class="form-label" for="rating">Rating</label>
    <input class="form-range" type="range" min="1" max="5" id="rating" name="rating">
  </div>
  <div class="mb-3">
    <label class="form-label" for="body">Review</label>
    <textarea class="form-control" name="body" id="body" cols="30" rows="3" required></textarea>
  </div>
  <button class="btn btn-success">Submit</button>
</form>"#,
            id = campground.id
        )
    } else {
        String::new()
    };

    let review_cards: String = reviews
        .iter()
        .map(|review| review_card(ctx, review))
        .collect();

    let body = format!(
        r#"<div class="row">
  <div class="col-6">
    <div class="card mb-3">
      {image}
      <div class="card-body">
        <h5 class="card-title">{title}</h5>
        <p class="card-text">{description}</p>
      </div>
      <ul class="list-group list-group-flush">
        <li class="list-group-item text-muted">{location}</li>
        <li class="list-group-item">Submitted by {author}</li>
        <li class="list-group-item">${price:.2}/night</li>
      </ul>
      {owner_actions}
    </div>
  </div>
  <div class="col-6">
    {review_form}
    {review_cards}
  </div>
</div>"#,
        image = image_tag(campground),
        title = escape(&campground.title),
        description = escape(&campground.description),
        location = escape(&campground.location),
        author = escape(&campground.author_username),
        price = campground.price,
    );
    layout(ctx, &campground.title, &body)
}

/// Registration form.
pub fn register(ctx: &RequestContext) -> String {
    layout(
        ctx,
        "Register",
        r#"<h1>Register</h1>
<form action="/register" method="POST">
  <div class="mb-3">
    <label class="form-label" for="username">Username</label>
    <input class="form-control" type="text" id="username" name="username" required autofocus>
  </div>
  <div class="mb-3">
    <label class="form-label" for="email">Email</label>
    <input class="form-control" type="email" id="email" name="email" required>
  </div>
  <div class="mb-3">
    <label class="form-label" for="password">Password</label>
    <input class="form-control" type="password" id="password" name="password" required>
  </div>
  <button class="btn btn-success">Register</button>
</form>"#,
    )
}

/// Login form.
pub fn login(ctx: &RequestContext) -> String {
    layout(
        ctx,
        "Login",
        r#"<h1>Login</h1>
<form action="/login" method="POST">
  <div class="mb-3">
    <label class="form-label" for="username">Username</label>
    <input class="form-control" type="text" id="username" name="username" required autofocus>
  </div>
  <div class="mb-3">
    <label class="form-label" for="password">Password</label>
    <input class="form-control" type="password" id="password" name="password" required>
  </div>
  <button class="btn btn-success">Login</button>
</form>"#,
    )
}

/// Error page for `status` showing `message`.
pub fn error_page(ctx: &RequestContext, status: StatusCode, message: &str) -> String {
    let body = format!(
        r#"<div class="row">
  <div class="col-6 offset-3">
    <div class="alert alert-danger" role="alert">
      <h4 class="alert-heading">{message}</h4>
      <p class="mb-0">Error {code}</p>
    </div>
  </div>
</div>"#,
        message = escape(message),
        code = status.as_u16(),
    );
    layout(ctx, "Error", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_services::Identity;
    use uuid::Uuid;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
        assert_eq!(escape("Misty Creek"), "Misty Creek");
    }

    #[test]
    fn test_layout_shows_flash_and_user() {
        let ctx = RequestContext {
            current_user: Some(Identity {
                id: Uuid::new_v4(),
                username: "colt<b>".to_string(),
                email: "colt@example.com".to_string(),
            }),
            success: vec!["Welcome back!".to_string()],
            error: vec![],
        };

        let page = home(&ctx);
        assert!(page.contains("Welcome back!"));
        assert!(page.contains("Signed in as colt&lt;b&gt;"));
        assert!(page.contains("/logout"));
        assert!(!page.contains("alert-danger"));
    }

    #[test]
    fn test_anonymous_layout_offers_login() {
        let page = home(&RequestContext::default());
        assert!(page.contains(r#"href="/login""#));
        assert!(page.contains(r#"href="/register""#));
    }

    #[test]
    fn test_error_page() {
        let page = error_page(
            &RequestContext::default(),
            StatusCode::NOT_FOUND,
            "Page Not Found",
        );
        assert!(page.contains("Page Not Found"));
        assert!(page.contains("Error 404"));
    }
}
