//! HTTP handler functions for the predictor form and API.

use actix_multipart::form::MultipartForm;
use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_web::{HttpResponse, web};

use crate::AppState;

/// The upload form: one image file and three free-text fields.
#[derive(MultipartForm)]
pub struct PredictForm {
    /// The photocard image.
    #[multipart(limit = "10MB")]
    image: Option<TempFile>,
    /// Photocard title (in English).
    title: Option<Text<String>>,
    /// Member name.
    member: Option<Text<String>>,
    /// Group name.
    group: Option<Text<String>>,
}

/// A fully validated form submission.
struct Submission {
    image: Vec<u8>,
    title: String,
    member: String,
    group: String,
}

/// `GET /`
///
/// Renders the empty prediction form.
pub async fn index() -> HttpResponse {
    html_page(form_page(None))
}

/// `POST /predict`
///
/// Validates the form and re-renders it with either the formatted price
/// or a warning. Predictor failures surface as a 500.
pub async fn predict_form(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<PredictForm>,
) -> HttpResponse {
    let Some(submission) = read_submission(&form) else {
        return html_page(form_page(Some((
            "warning",
            "Please fill in all fields and upload an image.".to_string(),
        ))));
    };

    match run_prediction(&state, &submission).await {
        Ok(price) => html_page(form_page(Some((
            "success",
            format!("Predicted Price: {}", format_price(price)),
        )))),
        Err(e) => {
            log::error!("Prediction failed: {e}");
            HttpResponse::InternalServerError()
                .content_type("text/html; charset=utf-8")
                .body(form_page(Some(("error", "Prediction failed.".to_string()))))
        }
    }
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /api/predict`
///
/// Same prediction as the form, as JSON: `{"price": ..}` on success, 400
/// on missing fields, 500 on predictor failure.
pub async fn predict(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<PredictForm>,
) -> HttpResponse {
    let Some(submission) = read_submission(&form) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "image, title, member and group are all required"
        }));
    };

    match run_prediction(&state, &submission).await {
        Ok(price) => HttpResponse::Ok().json(serde_json::json!({ "price": price })),
        Err(e) => {
            log::error!("Prediction failed: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Prediction failed"
            }))
        }
    }
}

async fn run_prediction(
    state: &web::Data<AppState>,
    submission: &Submission,
) -> Result<f64, photocard_predict::PredictError> {
    state
        .predictor
        .predict(
            &submission.image,
            &submission.title,
            &submission.member,
            &submission.group,
        )
        .await
}

/// Pulls a complete submission out of the multipart form, or `None` if
/// any field is missing or empty.
fn read_submission(form: &PredictForm) -> Option<Submission> {
    let image_file = form.image.as_ref()?;
    let image = std::fs::read(image_file.file.path()).ok()?;
    if image.is_empty() {
        return None;
    }

    Some(Submission {
        image,
        title: non_empty(form.title.as_deref()?)?,
        member: non_empty(form.member.as_deref()?)?,
        group: non_empty(form.group.as_deref()?)?,
    })
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn html_page(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Formats a price as whole yen with thousands separators.
fn format_price(price: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = price.round().max(0.0) as u64;
    let digits = rounded.to_string();

    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(ch);
    }
    formatted
}

/// Renders the single-page form, optionally with a `(css class, text)`
/// notice banner above it.
fn form_page(notice: Option<(&str, String)>) -> String {
    let banner = notice.map_or_else(String::new, |(class, text)| {
        format!(r#"<p class="notice {class}">{text}</p>"#)
    });

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>K-pop Photocard Price Predictor</title>
  <style>
    body {{ font-family: sans-serif; max-width: 28rem; margin: 3rem auto; }}
    label {{ display: block; margin-top: 1rem; }}
    input {{ width: 100%; box-sizing: border-box; padding: 0.4rem; }}
    button {{ margin-top: 1.5rem; padding: 0.5rem 1.5rem; }}
    .notice {{ padding: 0.75rem; border-radius: 4px; }}
    .notice.success {{ background: #e2f5e6; }}
    .notice.warning {{ background: #fdf3d7; }}
    .notice.error {{ background: #fbe3e0; }}
  </style>
</head>
<body>
  <h1>K-pop Photocard Price Predictor</h1>
  {banner}
  <form action="/predict" method="post" enctype="multipart/form-data">
    <label>Upload photocard image
      <input type="file" name="image" accept=".jpg,.jpeg">
    </label>
    <label>Photocard title (in English)
      <input type="text" name="title">
    </label>
    <label>Member name (e.g. Anton)
      <input type="text" name="member">
    </label>
    <label>Group name (e.g. RIIZE)
      <input type="text" name="group">
    </label>
    <button type="submit">Predict Price</button>
  </form>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_prices_with_thousands_separators() {
        assert_eq!(format_price(1_234_567.4), "1,234,567");
        assert_eq!(format_price(999.9), "1,000");
        assert_eq!(format_price(42.0), "42");
        assert_eq!(format_price(0.0), "0");
    }

    #[test]
    fn form_page_has_all_four_inputs() {
        let page = form_page(None);
        for name in ["image", "title", "member", "group"] {
            assert!(page.contains(&format!(r#"name="{name}""#)));
        }
        assert!(!page.contains("notice"));
    }

    #[test]
    fn notice_banner_is_rendered_when_present() {
        let page = form_page(Some(("warning", "fill everything in".to_string())));
        assert!(page.contains(r#"class="notice warning""#));
        assert!(page.contains("fill everything in"));
    }

    #[test]
    fn blank_text_fields_are_rejected() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" RIIZE "), Some("RIIZE".to_owned()));
    }
}
