//! Templating engine stuff.

use serde::Serialize;
use std::borrow::Cow;
use handlebars::Handlebars;
use rouille::Response;
use log::*;

use crate::errors::*;

#[derive(Serialize)]
pub struct TemplateContext<'a, T> where T: Serialize {
    pub template: &'static str,
    pub title: Cow<'a, str>,
    pub body: T
}
impl<'a, T> TemplateContext<'a, T> where T: Serialize {
    pub fn render(self, hbs: &Handlebars) -> WebResult<Response> {
        match hbs.render(self.template, &self) {
            Ok(d) => Ok(Response::html(d)),
            Err(e) => {
                warn!("Failed to render template: {}", e);
                Err(e)?
            }
        }
    }
}

struct Partial {
    name: &'static str,
    content: &'static str
}
macro_rules! partial {
    ($name:expr) => {
        Partial {
            name: $name,
            content: include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $name, ".html.hbs"))
        }
    }
}

static PARTIALS: [Partial; 3] = [
    partial!("header"),
    partial!("footer"),
    partial!("dashboard")
];
pub fn handlebars_init() -> Result<Handlebars> {
    let mut hbs = Handlebars::new();
    hbs.set_strict_mode(true);
    for partial in PARTIALS.iter() {
        hbs.register_partial(partial.name, partial.content)?;
    }
    Ok(hbs)
}
