// Plan, apply, refresh, destroy, show
pub mod declarative;

// Ad hoc data source lookups
pub mod lookup;

// Bulk bucket cleanup
pub mod sweep;

use anyhow::Result;

use crate::Context;
use crate::config::ProviderSettings;
use crate::schema::Declaration;

/// The declaration file, or an empty declaration when there is none
///
/// Commands like `destroy` and `sweep` only need the `[provider]` table.
pub(crate) fn declaration_or_default(ctx: &Context) -> Result<Declaration> {
    if ctx.file.exists() {
        Declaration::load(&ctx.file)
    } else {
        log::debug!("{} not found, using an empty declaration", ctx.file.display());
        Ok(Declaration::default())
    }
}

/// Settings for commands that work without declared resources
pub(crate) fn standalone_settings(ctx: &Context) -> Result<ProviderSettings> {
    declaration_or_default(ctx)?.provider.resolve(&ctx.overrides)
}
