//! Registry of Runscope resource and data source types

use crate::data_sources::{
    bucket::BucketDataSource, buckets::BucketsDataSource, integration::IntegrationDataSource,
    integrations::IntegrationsDataSource,
};
use crate::resources::{
    bucket::BucketResource, environment::EnvironmentResource, schedule::ScheduleResource,
    step::StepResource, step_token::StepTokenResource, test::TestResource,
};
use anyhow::{Result, anyhow};
use declarative::{BoxedDataSource, BoxedResource, DataSource, Resource};
use runscope::Client;
use std::collections::BTreeMap;

pub struct Provider {
    resources: BTreeMap<&'static str, BoxedResource<Client>>,
    data_sources: BTreeMap<&'static str, BoxedDataSource<Client>>,
}

impl Provider {
    pub fn new() -> Self {
        let resources: Vec<BoxedResource<Client>> = vec![
            Box::new(BucketResource),
            Box::new(TestResource),
            Box::new(EnvironmentResource),
            Box::new(ScheduleResource),
            Box::new(StepResource),
            Box::new(StepTokenResource),
        ];
        let data_sources: Vec<BoxedDataSource<Client>> = vec![
            Box::new(BucketDataSource),
            Box::new(BucketsDataSource),
            Box::new(IntegrationDataSource),
            Box::new(IntegrationsDataSource),
        ];

        Self {
            resources: resources
                .into_iter()
                .map(|r| (r.resource_type(), r))
                .collect(),
            data_sources: data_sources
                .into_iter()
                .map(|d| (d.data_source_type(), d))
                .collect(),
        }
    }

    pub fn resource(&self, resource_type: &str) -> Result<&dyn Resource<Client>> {
        self.resources
            .get(resource_type)
            .map(|r| &**r)
            .ok_or_else(|| {
                anyhow!(
                    "unknown resource type '{resource_type}' (known: {})",
                    self.resource_types().collect::<Vec<_>>().join(", ")
                )
            })
    }

    pub fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource<Client>> {
        self.data_sources
            .get(data_source_type)
            .map(|r| &**r)
            .ok_or_else(|| {
                anyhow!(
                    "unknown data source type '{data_source_type}' (known: {})",
                    self.data_source_types().collect::<Vec<_>>().join(", ")
                )
            })
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}
