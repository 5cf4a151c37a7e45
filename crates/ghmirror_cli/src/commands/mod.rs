pub(crate) mod comments;
pub(crate) mod deep;
pub(crate) mod migrate;
pub(crate) mod produce;
pub(crate) mod shared;
pub(crate) mod status;
pub(crate) mod sync;
pub(crate) mod work;
