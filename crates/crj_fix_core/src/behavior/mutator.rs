use log::debug;

use super::tree::ElementTree;
use crate::catalog::{ModificationCatalog, ModificationEntry};
use crate::error::{CoreError, CoreErrorCode};

/// Template the rewritten knob components are switched to. It is appended to
/// `ASCRJ_Templates.xml` by the package builder.
pub const KNOB_TEMPLATE_NAME: &str = "ASCRJ_Knob_Infinite_Push_Template";

/// Applies every catalog entry, in order, to one freshly loaded tree.
pub fn apply_catalog(
    tree: &mut ElementTree,
    catalog: &ModificationCatalog,
) -> Result<(), CoreError> {
    for entry in catalog.entries() {
        apply_entry(tree, entry)?;
    }
    Ok(())
}

pub fn apply_entry(tree: &mut ElementTree, entry: &ModificationEntry) -> Result<(), CoreError> {
    let button = tree.find_by_id(&entry.button_id)?;
    tree.detach(button);

    let knob = tree.find_by_id(&entry.knob_id)?;
    let template = tree.first_element_child(knob).ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::MissingTemplateNode,
            format!("knob '{}' has no template child to rewrite", entry.knob_id),
        )
    })?;

    tree.clear(template);
    tree.set_attribute(template, "Name", KNOB_TEMPLATE_NAME);

    // Current parameter names first, then the legacy names older simulator
    // builds still read.
    let parameters = [
        ("KNOB_ANIM_NAME", &entry.knob_anim_name),
        ("CHANGE_VAR_NAME", &entry.knob_change_name),
        ("PB_ANIM_NAME", &entry.push_anim_name),
        ("PB_TRIGGER_NAME", &entry.push_name),
        ("KNOB_CHANGE_NAME", &entry.knob_change_name),
        ("PUSH_ANIM_NAME", &entry.push_anim_name),
        ("PUSH_NAME", &entry.push_name),
    ];
    for (name, value) in parameters {
        tree.append_text_element(template, name, value.as_str());
    }

    debug!(
        "removed '{}' and rewrote '{}' to {KNOB_TEMPLATE_NAME}",
        entry.button_id, entry.knob_id
    );
    Ok(())
}
