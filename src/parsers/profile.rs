use crate::markup::{
    DEFAULT_NAME, DEFAULT_ROLL_NUMBER, DISPLAY_FIELD, MISSING_IMAGE, PLACEHOLDER_IMAGE_PATTERN,
    PROFILE_IMAGE, ROLL_NUMBER_FIELD,
};
use crate::models::Profile;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

/// Reads the profile header from the authenticated landing page.
///
/// Never fails: each missing field falls back to its placeholder value.
/// A relative image `src` is resolved against `page_url`, the address of
/// the document the markup came from.
pub fn parse_profile_from_html(html: &str, page_url: &str) -> Profile {
    let document = Html::parse_document(html);

    let name = first_text(&document, DISPLAY_FIELD).unwrap_or_else(|| DEFAULT_NAME.to_string());
    let roll_number =
        first_text(&document, ROLL_NUMBER_FIELD).unwrap_or_else(|| DEFAULT_ROLL_NUMBER.to_string());
    let image_url = image_url(&document, page_url).unwrap_or_else(|| MISSING_IMAGE.to_string());

    Profile {
        name,
        roll_number,
        image_url,
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(element_text)
}

fn image_url(document: &Html, page_url: &str) -> Option<String> {
    let selector = Selector::parse(PROFILE_IMAGE).ok()?;
    let src = document
        .select(&selector)
        .next()?
        .value()
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty())?;

    if src.contains(PLACEHOLDER_IMAGE_PATTERN) {
        return None;
    }

    // `src` in the raw DOM may be relative; report it the way the browser resolves it.
    let resolved = Url::parse(page_url)
        .and_then(|base| base.join(src))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| src.to_string());
    Some(resolved)
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
