/// Static checks on render pass descriptions
///
/// `check_structure` rejects malformed descriptions (bad indices, empty
/// subpass list). `validate_dependencies` looks for read-after-write hazards
/// on attachments that no subpass dependency covers.

use std::fmt;
use crate::error::{Error, Result};
use crate::graphics_device::{
    AccessFlags, ImageLayout, PipelineStages, RenderPassDesc, SubpassDependency, SubpassRef,
};

/// Reason a read is not protected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardKind {
    /// No dependency edge from the writer to the reader
    MissingDependency,
    /// An edge exists but its source stages/access miss the write
    SourceNotCovered,
    /// An edge exists but its destination stages/access miss the read
    DestinationNotCovered,
}

/// One unprotected attachment read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardViolation {
    /// Subpass performing the read
    pub subpass: u32,
    /// Attachment index being read
    pub attachment: u32,
    /// Last writer of the attachment (External when no earlier subpass wrote it)
    pub writer: SubpassRef,
    pub kind: HazardKind,
}

impl fmt::Display for HazardViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let writer = match self.writer {
            SubpassRef::External => "External".to_string(),
            SubpassRef::Index(i) => format!("subpass {}", i),
        };
        write!(
            f,
            "subpass {} reads attachment {} written by {}: {:?}",
            self.subpass, self.attachment, writer, self.kind
        )
    }
}

#[derive(Clone, Copy)]
struct Requirement {
    /// Any one of these stages satisfies the requirement
    stages: PipelineStages,
    access: AccessFlags,
    /// Access mask that implies `access`
    broad_access: AccessFlags,
}

const COLOR_WRITE: Requirement = Requirement {
    stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
    access: AccessFlags::COLOR_ATTACHMENT_WRITE,
    broad_access: AccessFlags::MEMORY_WRITE,
};

const DEPTH_WRITE: Requirement = Requirement {
    stages: PipelineStages::EARLY_FRAGMENT_TESTS.union(PipelineStages::LATE_FRAGMENT_TESTS),
    access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
    broad_access: AccessFlags::MEMORY_WRITE,
};

const INPUT_READ: Requirement = Requirement {
    stages: PipelineStages::FRAGMENT_SHADER,
    access: AccessFlags::INPUT_ATTACHMENT_READ,
    broad_access: AccessFlags::MEMORY_READ,
};

const DEPTH_READ: Requirement = Requirement {
    stages: PipelineStages::EARLY_FRAGMENT_TESTS.union(PipelineStages::LATE_FRAGMENT_TESTS),
    access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
    broad_access: AccessFlags::MEMORY_READ,
};

fn graphics_stages() -> PipelineStages {
    PipelineStages::VERTEX_SHADER
        | PipelineStages::GEOMETRY_SHADER
        | PipelineStages::FRAGMENT_SHADER
        | PipelineStages::EARLY_FRAGMENT_TESTS
        | PipelineStages::LATE_FRAGMENT_TESTS
        | PipelineStages::COLOR_ATTACHMENT_OUTPUT
}

fn stages_cover(mask: PipelineStages, required: PipelineStages) -> bool {
    if mask.contains(PipelineStages::ALL_COMMANDS) {
        return true;
    }
    if mask.contains(PipelineStages::ALL_GRAPHICS) && required.intersects(graphics_stages()) {
        return true;
    }
    mask.intersects(required)
}

fn covers(stages: PipelineStages, access: AccessFlags, req: Requirement) -> bool {
    stages_cover(stages, req.stages) && (access.contains(req.access) || access.contains(req.broad_access))
}

/// Last subpass before `reader` that writes `attachment`, with the write kind
fn last_writer(desc: &RenderPassDesc, reader: usize, attachment: u32) -> Option<(u32, Requirement)> {
    desc.subpasses[..reader].iter().enumerate().rev().find_map(|(index, subpass)| {
        if subpass.color_attachments.iter().any(|r| r.attachment == attachment) {
            return Some((index as u32, COLOR_WRITE));
        }
        match subpass.depth_stencil_attachment {
            Some(r) if r.attachment == attachment && r.layout != ImageLayout::DepthStencilReadOnly => {
                Some((index as u32, DEPTH_WRITE))
            }
            _ => None,
        }
    })
}

fn check_edge(
    dependencies: &[SubpassDependency],
    writer: SubpassRef,
    reader: u32,
    write: Option<Requirement>,
    read: Requirement,
) -> Option<HazardKind> {
    let edges: Vec<&SubpassDependency> = dependencies
        .iter()
        .filter(|d| d.src_subpass == writer && d.dst_subpass == SubpassRef::Index(reader))
        .collect();
    if edges.is_empty() {
        return Some(HazardKind::MissingDependency);
    }

    let src_ok = |d: &&SubpassDependency| match write {
        Some(req) => covers(d.src_stages, d.src_access, req),
        None => true,
    };
    if !edges.iter().any(src_ok) {
        return Some(HazardKind::SourceNotCovered);
    }
    if !edges.iter().filter(|d| src_ok(*d)).any(|d| covers(d.dst_stages, d.dst_access, read)) {
        return Some(HazardKind::DestinationNotCovered);
    }
    None
}

/// Check that every input-attachment read and read-only depth use is covered
/// by a dependency from the subpass that last wrote the attachment
pub fn validate_dependencies(desc: &RenderPassDesc) -> std::result::Result<(), Vec<HazardViolation>> {
    let mut violations = Vec::new();

    for (index, subpass) in desc.subpasses.iter().enumerate() {
        let mut reads: Vec<(u32, Requirement)> = subpass
            .input_attachments
            .iter()
            .map(|r| (r.attachment, INPUT_READ))
            .collect();
        if let Some(depth) = subpass.depth_stencil_attachment {
            if depth.layout == ImageLayout::DepthStencilReadOnly {
                reads.push((depth.attachment, DEPTH_READ));
            }
        }

        for (attachment, read) in reads {
            let (writer, write) = match last_writer(desc, index, attachment) {
                Some((w, req)) => (SubpassRef::Index(w), Some(req)),
                None => (SubpassRef::External, None),
            };
            if let Some(kind) = check_edge(&desc.dependencies, writer, index as u32, write, read) {
                violations.push(HazardViolation { subpass: index as u32, attachment, writer, kind });
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Reject descriptions whose indices do not resolve or whose dependencies run backwards
pub fn check_structure(desc: &RenderPassDesc) -> Result<()> {
    let invalid = |msg: String| Err(Error::InvalidResource(format!("render pass '{}': {}", desc.name, msg)));

    if desc.subpasses.is_empty() {
        return invalid("no subpasses".to_string());
    }

    let attachment_count = desc.attachments.len() as u32;
    for (index, subpass) in desc.subpasses.iter().enumerate() {
        let refs = subpass
            .color_attachments
            .iter()
            .chain(subpass.input_attachments.iter())
            .chain(subpass.depth_stencil_attachment.iter());
        for r in refs {
            if r.attachment >= attachment_count {
                return invalid(format!(
                    "subpass {} references attachment {} ({} declared)",
                    index, r.attachment, attachment_count
                ));
            }
        }
        for r in &subpass.color_attachments {
            if desc.attachments[r.attachment as usize].format.is_depth() {
                return invalid(format!("subpass {} uses depth attachment {} as color", index, r.attachment));
            }
        }
        if let Some(r) = subpass.depth_stencil_attachment {
            if !desc.attachments[r.attachment as usize].format.is_depth() {
                return invalid(format!("subpass {} uses color attachment {} as depth", index, r.attachment));
            }
        }
    }

    let subpass_count = desc.subpasses.len() as u32;
    for dep in &desc.dependencies {
        for end in [dep.src_subpass, dep.dst_subpass] {
            if let SubpassRef::Index(i) = end {
                if i >= subpass_count {
                    return invalid(format!("dependency names unknown subpass {}", i));
                }
            }
        }
        if dep.src_subpass == SubpassRef::External && dep.dst_subpass == SubpassRef::External {
            return invalid("dependency from External to External".to_string());
        }
        if let (SubpassRef::Index(src), SubpassRef::Index(dst)) = (dep.src_subpass, dep.dst_subpass) {
            if src > dst {
                return invalid(format!("dependency runs backwards from subpass {} to {}", src, dst));
            }
        }
    }
    Ok(())
}
