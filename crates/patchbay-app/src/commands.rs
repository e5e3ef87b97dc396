use std::fmt;
use std::path::PathBuf;

use patchbay_catalog::PluginDescriptor;
use patchbay_graph::{NodeId, WindowKind};

/// Commands issued by UI widgets towards the document.
#[derive(Debug, Clone)]
pub enum Command {
    // File handling
    NewPatch,
    OpenPatch,
    OpenPatchFile(PathBuf),
    SavePatch,
    SavePatchAs,
    Quit,

    // Graph edits
    AddPlugin(PluginDescriptor),
    RemoveNode(NodeId),
    ConnectStereo { from: NodeId, to: NodeId },
    ConnectMidi { from: NodeId, to: NodeId },
    DisconnectNode(NodeId),

    // Windows
    OpenWindow(NodeId, WindowKind),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::NewPatch => write!(f, "NewPatch"),
            Command::OpenPatch => write!(f, "OpenPatch"),
            Command::OpenPatchFile(path) => write!(f, "OpenPatchFile({})", path.display()),
            Command::SavePatch => write!(f, "SavePatch"),
            Command::SavePatchAs => write!(f, "SavePatchAs"),
            Command::Quit => write!(f, "Quit"),
            Command::AddPlugin(descriptor) => write!(f, "AddPlugin({})", descriptor.name),
            Command::RemoveNode(id) => write!(f, "RemoveNode({})", id.0),
            Command::ConnectStereo { from, to } => {
                write!(f, "ConnectStereo({} -> {})", from.0, to.0)
            }
            Command::ConnectMidi { from, to } => write!(f, "ConnectMidi({} -> {})", from.0, to.0),
            Command::DisconnectNode(id) => write!(f, "DisconnectNode({})", id.0),
            Command::OpenWindow(id, kind) => write!(f, "OpenWindow({}, {kind:?})", id.0),
        }
    }
}
