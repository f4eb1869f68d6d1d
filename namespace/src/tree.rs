//! The namespace tree

use crate::node::{Directory, Node};
use crate::path::PathResolver;
use core_types::{Errno, KResult, MountId};
use serde_json::Value;
use std::collections::VecDeque;

/// Outcome of resolving a path
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A plain node owned by the tree
    Node(&'a Node),
    /// The path is at or below a mount point
    Mount {
        mount_id: MountId,
        /// Canonical path of the mount point
        mount_path: String,
        /// Segments below the mount point
        sub_path: Vec<String>,
    },
}

/// Tree of named nodes rooted at `/`
#[derive(Debug, Clone)]
pub struct Namespace {
    root: Node,
}

impl Namespace {
    /// Creates a namespace holding only the root directory
    pub fn new() -> Self {
        Self {
            root: Node::Directory(Directory::new()),
        }
    }

    /// Resolves a path segment by segment
    ///
    /// Stops at the first mount point encountered; since nothing can be
    /// created beneath a mount point, that is also the longest mounted
    /// prefix.
    pub fn resolve(&self, path: &str) -> KResult<Resolution<'_>> {
        let segments = PathResolver::split_path(path);
        let mut node = &self.root;
        for (index, segment) in segments.iter().enumerate() {
            match node {
                Node::Mount(mount_id) => {
                    return Ok(Resolution::Mount {
                        mount_id: *mount_id,
                        mount_path: PathResolver::join(&segments[..index]),
                        sub_path: segments[index..].to_vec(),
                    });
                }
                Node::Directory(dir) => {
                    node = dir.get(segment).ok_or(Errno::ENOENT)?;
                }
                Node::Data(_) | Node::Pipe(_) => return Err(Errno::ENOTDIR),
            }
        }

        if let Node::Mount(mount_id) = node {
            return Ok(Resolution::Mount {
                mount_id: *mount_id,
                mount_path: PathResolver::join(&segments),
                sub_path: Vec::new(),
            });
        }
        Ok(Resolution::Node(node))
    }

    /// True if the path resolves to a node or falls under a mount point
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Gets a mutable plain node
    ///
    /// Fails with `EBUSY` if the path is at or below a mount point.
    pub fn node_mut(&mut self, path: &str) -> KResult<&mut Node> {
        let segments = PathResolver::split_path(path);
        let node = self.walk_mut(&segments)?;
        if matches!(node, Node::Mount(_)) {
            return Err(Errno::EBUSY);
        }
        Ok(node)
    }

    /// Creates a directory whose parent already exists
    pub fn mkdir(&mut self, path: &str) -> KResult<()> {
        self.insert_new(path, Node::Directory(Directory::new()))
    }

    /// Creates a directory and any missing parents
    pub fn mkdir_all(&mut self, path: &str) -> KResult<()> {
        let segments = PathResolver::split_path(path);
        for end in 1..=segments.len() {
            let prefix = PathResolver::join(&segments[..end]);
            let missing = match self.resolve(&prefix) {
                Ok(Resolution::Node(Node::Directory(_))) => false,
                Ok(Resolution::Node(_)) => return Err(Errno::ENOTDIR),
                Ok(Resolution::Mount { .. }) => return Err(Errno::EBUSY),
                Err(Errno::ENOENT) => true,
                Err(errno) => return Err(errno),
            };
            if missing {
                self.mkdir(&prefix)?;
            }
        }
        Ok(())
    }

    /// Creates a data node
    pub fn create(&mut self, path: &str, data: Value) -> KResult<()> {
        self.insert_new(path, Node::Data(data))
    }

    /// Creates an empty named pipe
    pub fn mkfifo(&mut self, path: &str) -> KResult<()> {
        self.insert_new(path, Node::Pipe(VecDeque::new()))
    }

    /// Binds a mount point at `path`
    ///
    /// The path may be absent or an empty directory. Its parent must exist.
    pub fn attach_mount(&mut self, path: &str, mount_id: MountId) -> KResult<()> {
        let (dir, name) = self.parent_mut(path)?;
        let verdict = match dir.get(&name) {
            None => Ok(()),
            Some(Node::Directory(existing)) if existing.is_empty() => Ok(()),
            Some(Node::Directory(_)) | Some(Node::Mount(_)) => Err(Errno::EBUSY),
            Some(Node::Data(_)) | Some(Node::Pipe(_)) => Err(Errno::EEXIST),
        };
        verdict?;
        dir.insert(name, Node::Mount(mount_id));
        Ok(())
    }

    /// Removes the mount point at `path`
    pub fn detach_mount(&mut self, path: &str) -> KResult<MountId> {
        let (dir, name) = self.parent_mut(path)?;
        let mount_id = match dir.get(&name) {
            Some(Node::Mount(mount_id)) => *mount_id,
            Some(_) => return Err(Errno::EINVAL),
            None => return Err(Errno::ENOENT),
        };
        dir.remove(&name);
        Ok(mount_id)
    }

    /// Removes a data node, pipe or empty directory
    pub fn unlink(&mut self, path: &str) -> KResult<()> {
        let (dir, name) = self.parent_mut(path)?;
        let verdict = match dir.get(&name) {
            None => Err(Errno::ENOENT),
            Some(Node::Mount(_)) => Err(Errno::EBUSY),
            Some(Node::Directory(existing)) if !existing.is_empty() => Err(Errno::EBUSY),
            Some(_) => Ok(()),
        };
        verdict?;
        dir.remove(&name);
        Ok(())
    }

    fn insert_new(&mut self, path: &str, node: Node) -> KResult<()> {
        let (dir, name) = self.parent_mut(path)?;
        if dir.get(&name).is_some() {
            return Err(Errno::EEXIST);
        }
        dir.insert(name, node);
        Ok(())
    }

    fn parent_mut(&mut self, path: &str) -> KResult<(&mut Directory, String)> {
        let mut segments = PathResolver::split_path(path);
        // The root always exists and can never be replaced.
        let name = segments.pop().ok_or(Errno::EEXIST)?;
        if !PathResolver::is_valid_name(&name) {
            return Err(Errno::EINVAL);
        }
        match self.walk_mut(&segments)? {
            Node::Directory(dir) => Ok((dir, name)),
            Node::Mount(_) => Err(Errno::EBUSY),
            Node::Data(_) | Node::Pipe(_) => Err(Errno::ENOTDIR),
        }
    }

    fn walk_mut(&mut self, segments: &[String]) -> KResult<&mut Node> {
        let mut node = &mut self.root;
        for segment in segments {
            node = match node {
                Node::Directory(dir) => dir.get_mut(segment).ok_or(Errno::ENOENT)?,
                Node::Mount(_) => return Err(Errno::EBUSY),
                Node::Data(_) | Node::Pipe(_) => return Err(Errno::ENOTDIR),
            };
        }
        Ok(node)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mount_of(ns: &Namespace, path: &str) -> (MountId, String, Vec<String>) {
        match ns.resolve(path).unwrap() {
            Resolution::Mount {
                mount_id,
                mount_path,
                sub_path,
            } => (mount_id, mount_path, sub_path),
            Resolution::Node(node) => panic!("expected mount, got {:?}", node.kind()),
        }
    }

    #[test]
    fn test_root_resolves_to_directory() {
        let ns = Namespace::new();
        assert!(matches!(
            ns.resolve("/").unwrap(),
            Resolution::Node(Node::Directory(_))
        ));
    }

    #[test]
    fn test_mkdir_requires_parent() {
        let mut ns = Namespace::new();
        assert_eq!(ns.mkdir("/var/run"), Err(Errno::ENOENT));
        ns.mkdir("/var").unwrap();
        ns.mkdir("/var/run").unwrap();
        assert!(ns.exists("/var/run"));
    }

    #[test]
    fn test_mkdir_existing_is_eexist() {
        let mut ns = Namespace::new();
        ns.mkdir("/dev").unwrap();
        assert_eq!(ns.mkdir("/dev"), Err(Errno::EEXIST));
        assert_eq!(ns.mkdir("/"), Err(Errno::EEXIST));
    }

    #[test]
    fn test_mkdir_all_is_idempotent() {
        let mut ns = Namespace::new();
        ns.mkdir_all("/var/run/character").unwrap();
        ns.mkdir_all("/var/run/character").unwrap();
        assert!(ns.exists("/var/run/character"));
    }

    #[test]
    fn test_create_and_resolve_data() {
        let mut ns = Namespace::new();
        ns.mkdir("/etc").unwrap();
        ns.create("/etc/motd", json!({ "text": "hi" })).unwrap();
        match ns.resolve("/etc/motd").unwrap() {
            Resolution::Node(Node::Data(doc)) => assert_eq!(doc["text"], "hi"),
            _ => panic!("expected data node"),
        }
    }

    #[test]
    fn test_traversal_through_data_is_enotdir() {
        let mut ns = Namespace::new();
        ns.create("/file", json!({})).unwrap();
        assert_eq!(ns.resolve("/file/child").unwrap_err(), Errno::ENOTDIR);
        assert_eq!(ns.mkdir("/file/child"), Err(Errno::ENOTDIR));
    }

    #[test]
    fn test_resolution_stops_at_mount() {
        let mut ns = Namespace::new();
        ns.mkdir("/dev").unwrap();
        let id = MountId::new();
        ns.attach_mount("/dev/ability", id).unwrap();

        let (found, mount_path, sub_path) = mount_of(&ns, "/dev/ability/strength/total");
        assert_eq!(found, id);
        assert_eq!(mount_path, "/dev/ability");
        assert_eq!(sub_path, vec!["strength", "total"]);

        let (_, _, sub_path) = mount_of(&ns, "/dev/ability");
        assert!(sub_path.is_empty());
    }

    #[test]
    fn test_nothing_can_be_created_under_mount() {
        let mut ns = Namespace::new();
        ns.attach_mount("/v_entity", MountId::new()).unwrap();
        assert_eq!(ns.mkdir("/v_entity/x"), Err(Errno::EBUSY));
        assert_eq!(ns.create("/v_entity/x", json!({})), Err(Errno::EBUSY));
        assert_eq!(ns.attach_mount("/v_entity", MountId::new()), Err(Errno::EBUSY));
        assert_eq!(ns.node_mut("/v_entity").unwrap_err(), Errno::EBUSY);
    }

    #[test]
    fn test_mount_over_empty_directory_only() {
        let mut ns = Namespace::new();
        ns.mkdir_all("/proc/character").unwrap();
        ns.attach_mount("/proc/character", MountId::new()).unwrap();

        ns.mkdir_all("/busy/child").unwrap();
        assert_eq!(ns.attach_mount("/busy", MountId::new()), Err(Errno::EBUSY));

        ns.create("/data", json!(1)).unwrap();
        assert_eq!(ns.attach_mount("/data", MountId::new()), Err(Errno::EEXIST));
    }

    #[test]
    fn test_detach_mount() {
        let mut ns = Namespace::new();
        let id = MountId::new();
        ns.attach_mount("/db", id).unwrap();
        assert_eq!(ns.detach_mount("/db"), Ok(id));
        assert!(!ns.exists("/db"));
        assert_eq!(ns.detach_mount("/db"), Err(Errno::ENOENT));
    }

    #[test]
    fn test_unlink() {
        let mut ns = Namespace::new();
        ns.mkdir_all("/var/log").unwrap();
        ns.create("/var/log/boot", json!([])).unwrap();
        assert_eq!(ns.unlink("/var/log"), Err(Errno::EBUSY));
        ns.unlink("/var/log/boot").unwrap();
        ns.unlink("/var/log").unwrap();
        assert_eq!(ns.unlink("/var/log"), Err(Errno::ENOENT));
    }

    #[test]
    fn test_pipe_node() {
        let mut ns = Namespace::new();
        ns.mkfifo("/events").unwrap();
        if let Node::Pipe(queue) = ns.node_mut("/events").unwrap() {
            queue.push_back(json!({ "event": "boot" }));
        }
        match ns.resolve("/events").unwrap() {
            Resolution::Node(Node::Pipe(queue)) => assert_eq!(queue.len(), 1),
            _ => panic!("expected pipe"),
        }
    }
}
