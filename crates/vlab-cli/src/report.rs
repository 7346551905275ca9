//! Impresión legible de muestras, contenedores y resultados de acciones.
use std::fmt::Write;

use vlab_core::ActionResult;
use vlab_domain::{Composition, ContainerSpec, FlatComposition, Sample};

fn yes_no(flag: bool) -> &'static str {
    if flag { "True" } else { "False" }
}

pub fn render_container(spec: &ContainerSpec) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Container: {}", spec.description);
    let _ = writeln!(out, "----------------------------------------");
    let _ = writeln!(out, "Specifications:");
    let _ = writeln!(out, "    Reusable: {}", yes_no(spec.reusable));
    let _ = writeln!(out, "    Hermetic: {}", yes_no(spec.hermetic));
    let _ = writeln!(out, "    Opaque: {}", yes_no(spec.opaque));
    let _ = writeln!(out, "    Aspiratable: {}", yes_no(spec.aspiratable));
    let _ = writeln!(out, "    Container Materials: {:?}", spec.materials);
    let _ = writeln!(out, "    Purposes: {:?}", spec.purposes);
    let _ = writeln!(out, "    Compatible with: {:?}", spec.compatible_with);
    let _ = writeln!(out, "Operating Limits:");
    let _ = writeln!(out, "    Min Temperature: {}", spec.limits.min_temperature);
    let _ = writeln!(out, "    Max Temperature: {}", spec.limits.max_temperature);
    let _ = writeln!(out, "    Min Volume: {}", spec.limits.min_volume);
    let _ = write!(out, "    Max Volume: {}", spec.limits.max_volume);
    out
}

fn write_components(out: &mut String, flat: &FlatComposition) {
    for c in flat.components() {
        let _ = writeln!(out, "- {}: {}", c.entity.name(), c.quantity);
    }
}

pub fn render_sample(sample: &Sample) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name: {}", sample.name());
    let _ = writeln!(out, "ID: {}", sample.id());
    let _ = writeln!(out, "{}", render_container(sample.container()));
    match sample.composition() {
        Composition::Superposed(sup) => {
            let _ = writeln!(out, "\nSample has {} possible states:", sup.len());
            for state in sup.states() {
                let _ = writeln!(out, "\nState (likelihood: {:?}):", state.pseudocount());
                write_components(&mut out, state.composition());
            }
            if let Some(total) = sup.most_likely().composition().total_volume() {
                let _ = writeln!(out, "\nTotal Volume: {total}");
            }
        }
        Composition::Flat(flat) => {
            let _ = writeln!(out, "Composition:");
            write_components(&mut out, flat);
            if let Some(total) = flat.total_volume() {
                let _ = writeln!(out, "\nTotal Volume: {total}");
            }
            if let Some(total) = flat.total_mass() {
                let _ = writeln!(out, "Total Mass: {total}");
            }
        }
    }
    out
}

pub fn render_combine_result(result: &ActionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nCombine Action Result:");
    let _ = writeln!(out, "Success: {}", result.success);
    if !result.success {
        let _ = writeln!(out, "Error: {}", result.error_message.as_deref().unwrap_or("unknown error"));
        return out;
    }
    if !result.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &result.warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }
    if !result.resulting_samples.is_empty() {
        let _ = writeln!(out, "\nResulting Sample:");
        for sample in &result.resulting_samples {
            let _ = writeln!(out);
            out.push_str(&render_sample(sample));
        }
    }
    out
}
