mod dispatch;
pub use dispatch::Thread;

mod http;
pub use http::HttpApi;

mod remote;
pub use remote::{ClientError, CommentApi};

mod thread;
pub use thread::{build_tree, count_nodes, find_node, walk, CommentNode};

mod view;
pub use view::{Actions, Expansion, Mode, NodeState, RenderedLine, ReplyBox, ThreadView};

pub mod api {
    pub use quill_api::*;
}
