// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod asset;
mod end_to_end;
mod query;
