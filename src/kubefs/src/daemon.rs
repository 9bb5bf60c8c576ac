use fuser::consts::FOPEN_DIRECT_IO;
use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request,
};
use libc::{EINVAL, EIO, ENOENT, EREMOTEIO, EROFS, ESTALE};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Runtime;

use fs_tree::{FileMode, FsError, FsResult, KubeFsTree};
use kube_api::{ContextSource, KubeContextSource};

const TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mountpoint: PathBuf,
    pub kubeconfig: Option<PathBuf>,
    pub allow_exec: Vec<String>,
    pub allow_other: bool,
    pub debug: bool,
}

pub(crate) fn map_fs_err(err: &FsError) -> i32 {
    match err {
        FsError::DoesNotExist => ENOENT,
        FsError::ReadOnly => EROFS,
        FsError::Stale(_) => ESTALE,
        FsError::RemoteIo(_) => EREMOTEIO,
        FsError::Api(api) if api.is_not_found() => ENOENT,
        FsError::ParamsMissing(_)
        | FsError::InvalidGroupVersion(_)
        | FsError::Api(_)
        | FsError::Internal(_) => EIO,
    }
}

fn file_type(mode: FileMode) -> FileType {
    match mode {
        FileMode::Directory => FileType::Directory,
        FileMode::Regular => FileType::RegularFile,
    }
}

pub(crate) fn build_attr(ino: u64, mode: FileMode) -> FileAttr {
    let now = SystemTime::now();
    let (kind, perm, nlink) = match mode {
        FileMode::Directory => (FileType::Directory, 0o755, 2),
        FileMode::Regular => (FileType::RegularFile, 0o644, 1),
    };
    FileAttr {
        ino,
        // Content is synthesized per open and served with direct I/O, so
        // the advertised size stays zero.
        size: 0,
        blocks: 1,
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind,
        perm,
        nlink,
        uid: unsafe { libc::getuid() },
        gid: unsafe { libc::getgid() },
        rdev: 0,
        flags: 0,
        blksize: 4096,
    }
}

/// Bridges kernel FUSE callbacks onto the async virtual tree. Callbacks
/// arrive on kernel worker threads and block on the owned runtime.
pub struct KubeFsDaemon {
    runtime: Runtime,
    tree: KubeFsTree,
}

impl KubeFsDaemon {
    pub fn new(runtime: Runtime, tree: KubeFsTree) -> Self {
        Self { runtime, tree }
    }
}

impl Filesystem for KubeFsDaemon {
    fn lookup(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: ReplyEntry,
    ) {
        let name = match name.to_str() {
            Some(name) => name,
            None => {
                reply.error(EINVAL);
                return;
            }
        };
        match self.runtime.block_on(self.tree.lookup(parent, name)) {
            Ok((ino, mode)) => reply.entry(&TTL, &build_attr(ino, mode), 0),
            Err(err) => reply.error(map_fs_err(&err)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.tree.getattr(ino) {
            Ok(mode) => reply.attr(&TTL, &build_attr(ino, mode)),
            Err(err) => reply.error(map_fs_err(&err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries = match self.runtime.block_on(self.tree.readdir(ino)) {
            Ok(entries) => entries,
            Err(err) => {
                reply.error(map_fs_err(&err));
                return;
            }
        };

        let mut stream = Vec::with_capacity(entries.len() + 2);
        stream.push((ino, FileType::Directory, ".".to_string()));
        stream.push((ino, FileType::Directory, "..".to_string()));
        for entry in entries {
            stream.push((entry.ino, file_type(entry.mode), entry.name));
        }
        for (idx, (entry_ino, kind, name)) in
            stream.into_iter().enumerate().skip(offset.max(0) as usize)
        {
            if reply.add(entry_ino, (idx + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let accmode = flags & libc::O_ACCMODE;
        let write = accmode == libc::O_WRONLY || accmode == libc::O_RDWR;
        match self.runtime.block_on(self.tree.open(ino, write)) {
            // Direct I/O keeps the kernel from caching synthesized content.
            Ok(fh) => reply.opened(fh, FOPEN_DIRECT_IO),
            Err(err) => reply.error(map_fs_err(&err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.runtime.block_on(self.tree.read(fh, offset, size)) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(map_fs_err(&err)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.runtime.block_on(self.tree.write(fh, offset, data)) {
            Ok(written) => reply.written(written as u32),
            Err(err) => reply.error(map_fs_err(&err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.tree.release(fh);
        reply.ok();
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn fsync(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _datasync: bool,
        reply: ReplyEmpty,
    ) {
        match self.tree.fsync(fh) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(map_fs_err(&err)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        // Editors truncate before rewriting edit files; all handles buffer
        // their own content, so attribute changes are accepted as no-ops.
        debug!("setattr ino={} size={:?}", ino, size);
        match self.tree.getattr(ino) {
            Ok(mode) => reply.attr(&TTL, &build_attr(ino, mode)),
            Err(err) => reply.error(map_fs_err(&err)),
        }
    }

    fn access(&mut self, _req: &Request<'_>, _ino: u64, _mask: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        reply.statfs(0, 0, 0, 0, 0, 512, 255, 0);
    }

    fn opendir(&mut self, _req: &Request<'_>, _ino: u64, _flags: i32, reply: ReplyOpen) {
        reply.opened(0, 0);
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn fsyncdir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _datasync: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }
}

pub fn run_daemon(options: RunOptions) -> FsResult<()> {
    let runtime =
        Runtime::new().map_err(|e| FsError::Internal(format!("failed to start runtime: {}", e)))?;
    let contexts: Arc<dyn ContextSource> = Arc::new(KubeContextSource::new(
        options.kubeconfig.clone(),
        options.allow_exec.clone(),
    ));
    let tree = KubeFsTree::new(contexts)?;
    let daemon = KubeFsDaemon::new(runtime, tree);

    let mut mount_options = vec![
        MountOption::FSName("kubefs".to_string()),
        MountOption::DefaultPermissions,
    ];
    if options.allow_other {
        mount_options.push(MountOption::AllowOther);
    }
    #[cfg(not(target_os = "macos"))]
    mount_options.push(MountOption::AutoUnmount);

    info!(
        "mounting kubefs at {:?}, kubeconfig={:?}, exec allowed on {:?}",
        options.mountpoint, options.kubeconfig, options.allow_exec
    );
    match fuser::spawn_mount2(daemon, &options.mountpoint, &mount_options) {
        Ok(session) => {
            println!("kubefs mounted at {:?}", options.mountpoint);
            session.join();
            Ok(())
        }
        Err(err) => Err(FsError::Internal(format!("mount failed: {}", err))),
    }
}
