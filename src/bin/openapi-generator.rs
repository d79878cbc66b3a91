//! Print the OpenAPI document as pretty JSON, e.g. to commit it or feed a client generator.

use doodle_party_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json()?);
    Ok(())
}
